pub mod classifier;
pub mod concentration;
pub mod config;
pub mod config_loader;
pub mod disputes;
pub mod error;
pub mod kelly;
pub mod market;
pub mod validation;

pub use classifier::{default_rules, CategoryClassifier, ClassifierRule};
pub use concentration::{ConcentrationReport, GiniBand, HhiBand};
pub use config::{ClassifierConfig, StatisticsConfig};
pub use config_loader::ConfigLoader;
pub use disputes::{
    IdentifierKind, KlerosDispute, KlerosDisputeSummary, KlerosVote, UmaDisputeSummary, UmaRequest,
    UmaVote,
};
pub use error::{DomainError, StatsError};
pub use kelly::{BetDecision, BetReason, KellySizer};
pub use market::{
    Category, DaysToCloseBucket, Horizon, LiquidityTier, Market, PriceObservation, Resolution,
    Side, VolumeTier,
};
pub use validation::{TestResult, WinRateValidation};
