//! Calibration estimation, strategy backtesting and validation.
//!
//! This crate provides:
//! - Price-bucket calibration curves and cross-sectional heatmaps
//! - Seeded bootstrap and permutation tests
//! - A Kelly-sized backtest engine with tiered spread costs
//! - Rolling-window and cross-validated backtests

pub mod bootstrap;
pub mod calibration;
pub mod calibration_summary;
pub mod cross_validation;
pub mod engine;
pub mod metrics;
pub mod permutation;
pub mod rolling;
pub mod significance;
pub mod slicer;
pub mod spread;

pub use bootstrap::{BootstrapConfig, BootstrapResampler, BootstrapResult};
pub use calibration::{
    deviation_by_range, BiasTable, BucketBias, BucketScheme, CalibrationConfig, CalibrationCurve,
    CalibrationEstimator, CalibrationFit, RangeDeviation,
};
pub use calibration_summary::{CalibrationSummary, HorizonSummary};
pub use cross_validation::{
    CrossValidationConfig, CrossValidationError, CrossValidationReport, CrossValidator, SplitPolicy,
};
pub use engine::{
    chronological_split, run_variants, BacktestConfig, BacktestEngine, CostVariant,
    StrategyResult, StrategyRule, Trade, VariantResult,
};
pub use metrics::StrategyMetrics;
pub use permutation::{PermutationConfig, PermutationResult, PermutationTest};
pub use rolling::{run_rolling, RollingConfig, RollingResult};
pub use significance::{
    BiasSignificanceReport, SignificanceAnalyzer, StrategyComparison, StrategySignificance,
    TierComparison,
};
pub use slicer::{CrossSectionalSlicer, Heatmap, SliceDimension};
pub use spread::{SpreadModel, TieredSpread, ZeroSpread};
