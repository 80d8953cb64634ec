//! Dataset loading and report output for calibration analysis.
//!
//! This crate provides:
//! - CSV record types with per-row validation
//! - The immutable `MarketDataset` handle with load reports
//! - Volume-quartile liquidity tiering and horizon snapshots
//! - Resolved-market summaries
//! - Oracle dispute exports
//! - JSON report writing

pub mod dataset;
pub mod disputes;
pub mod records;
pub mod report;
pub mod snapshots;
pub mod summary;
pub mod tiers;

pub use dataset::{load_balances, DataConfig, LoadReport, MarketDataset};
pub use disputes::DisputeData;
pub use records::{BalanceRecord, MarketRecord, PriceRecord, RecordError};
pub use report::{ReportEnvelope, ReportWriter};
pub use snapshots::{snapshot_at, CalibrationSample, Snapshot};
pub use summary::{ResolutionSplit, ResolvedSummary};
pub use tiers::LiquidityTiering;
