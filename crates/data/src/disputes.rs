//! Loading of oracle dispute exports.
//!
//! Four optional CSV files, one per record kind:
//!
//! | file                | columns |
//! |---------------------|---------|
//! | UMA requests        | `round_id,identifier,resolution_label,num_voters,consensus_rate` |
//! | UMA votes           | `round_id,voter,num_tokens` |
//! | Kleros disputes     | `dispute_id,ruling,num_votes,num_jurors_drawn,consensus_rate,num_appeals` |
//! | Kleros votes        | `dispute_id,voter` |
//!
//! Empty numeric cells read as missing.

use std::path::Path;

use anyhow::Result;
use calib_core::{KlerosDispute, KlerosVote, UmaRequest, UmaVote};
use serde::de::DeserializeOwned;
use tracing::info;

use crate::dataset::{read_csv, DataConfig};

/// Every dispute record found through a [`DataConfig`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisputeData {
    pub uma_requests: Vec<UmaRequest>,
    pub uma_votes: Vec<UmaVote>,
    pub kleros_disputes: Vec<KlerosDispute>,
    pub kleros_votes: Vec<KlerosVote>,
}

impl DisputeData {
    /// Reads each configured file; unset paths load as empty.
    ///
    /// # Errors
    /// Returns an error if a configured file is missing or has a malformed
    /// row.
    pub fn load(config: &DataConfig) -> Result<Self> {
        let data = Self {
            uma_requests: load_optional(config.uma_requests_path.as_deref(), "UMA requests")?,
            uma_votes: load_optional(config.uma_votes_path.as_deref(), "UMA votes")?,
            kleros_disputes: load_optional(config.kleros_disputes_path.as_deref(), "Kleros disputes")?,
            kleros_votes: load_optional(config.kleros_votes_path.as_deref(), "Kleros votes")?,
        };
        info!(
            uma_requests = data.uma_requests.len(),
            uma_votes = data.uma_votes.len(),
            kleros_disputes = data.kleros_disputes.len(),
            kleros_votes = data.kleros_votes.len(),
            "Loaded dispute records"
        );
        Ok(data)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.uma_requests.is_empty() && self.kleros_disputes.is_empty()
    }
}

fn load_optional<T: DeserializeOwned>(path: Option<&Path>, kind: &str) -> Result<Vec<T>> {
    match path {
        Some(path) => read_csv(path, kind),
        None => Ok(Vec::new()),
    }
}
