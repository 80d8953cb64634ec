//! Dispute resolution on the oracles that settle prediction markets.
//!
//! UMA's DVM resolves price requests by token-weighted vote; Kleros Court
//! resolves disputes by drawn jurors. Both summaries measure how decisive
//! and how concentrated those votes are. Ratios and shares are percentages
//! (0..=100), as in [`crate::concentration`].

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Consensus at or above this counts as unanimous.
pub const UNANIMOUS_CONSENSUS: f64 = 0.99;

/// Voters and jurors listed individually in a summary.
pub const TOP_PARTICIPANTS: usize = 10;

/// One resolved DVM price request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UmaRequest {
    pub round_id: u64,
    pub identifier: String,
    /// `Yes`, `No`, `Indeterminate`, `Unresolvable`, or the raw price.
    pub resolution_label: Option<String>,
    pub num_voters: Option<u32>,
    /// Token share behind the winning price, 0..=1.
    pub consensus_rate: Option<f64>,
}

/// One revealed DVM vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UmaVote {
    pub round_id: u64,
    pub voter: String,
    pub num_tokens: f64,
}

/// One Kleros Court dispute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KlerosDispute {
    pub dispute_id: u64,
    /// 0 means the court refused to arbitrate; missing means no ruling yet.
    pub ruling: Option<u32>,
    pub num_votes: Option<u32>,
    pub num_jurors_drawn: Option<u32>,
    /// Vote share of the majority choice, 0..=1.
    pub consensus_rate: Option<f64>,
    pub num_appeals: Option<u32>,
}

/// One juror vote in a Kleros dispute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KlerosVote {
    pub dispute_id: u64,
    pub voter: String,
}

/// What a DVM identifier asks the oracle to settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierKind {
    Governance,
    YesOrNoQuery,
    BridgeVerification,
    PriceFeed,
}

impl IdentifierKind {
    #[must_use]
    pub fn from_identifier(identifier: &str) -> Self {
        match identifier {
            id if id.starts_with("Admin") => Self::Governance,
            "YES_OR_NO_QUERY" => Self::YesOrNoQuery,
            "ACROSS-V2" | "IS_RELAY_VALID" => Self::BridgeVerification,
            _ => Self::PriceFeed,
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Governance => "Admin (Governance)",
            Self::YesOrNoQuery => "YES_OR_NO_QUERY",
            Self::BridgeVerification => "Bridge Verification",
            Self::PriceFeed => "Price Feed",
        }
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusStats {
    pub mean: f64,
    pub min: f64,
    pub unanimous_ratio: f64,
}

impl ConsensusStats {
    /// `None` when no rate is given.
    #[must_use]
    pub fn from_rates(rates: &[f64]) -> Option<Self> {
        if rates.is_empty() {
            return None;
        }
        let unanimous = rates.iter().filter(|r| **r >= UNANIMOUS_CONSENSUS).count();
        Some(Self {
            mean: rates.iter().sum::<f64>() / rates.len() as f64,
            min: rates.iter().copied().fold(f64::INFINITY, f64::min),
            unanimous_ratio: percent(unanimous, rates.len()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YesNoSummary {
    pub total: usize,
    pub resolution_distribution: BTreeMap<String, usize>,
    pub yes_count: usize,
    pub no_count: usize,
    pub indeterminate_count: usize,
    pub unresolvable_count: usize,
    pub avg_voters: Option<f64>,
    pub min_voters: Option<u32>,
    pub max_voters: Option<u32>,
    pub consensus: Option<ConsensusStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopVoter {
    pub address: String,
    pub tokens: f64,
    pub token_share: f64,
    pub rounds: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UmaVoterStats {
    pub unique_voters: usize,
    /// Voters seen in more than one round.
    pub repeat_voters: usize,
    pub repeat_voter_ratio: f64,
    /// `None` when no tokens were cast.
    pub top5_token_share: Option<f64>,
    pub top10_token_share: Option<f64>,
    pub top_voters: Vec<TopVoter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UmaDisputeSummary {
    pub total_requests: usize,
    pub identifier_kinds: BTreeMap<IdentifierKind, usize>,
    pub avg_voters_per_request: Option<f64>,
    /// `None` when no request is a yes/no query.
    pub yes_no: Option<YesNoSummary>,
    /// `None` without vote records.
    pub voters: Option<UmaVoterStats>,
}

impl UmaDisputeSummary {
    /// `None` for an empty request list.
    #[must_use]
    pub fn compute(requests: &[UmaRequest], votes: &[UmaVote]) -> Option<Self> {
        if requests.is_empty() {
            return None;
        }
        let mut identifier_kinds = BTreeMap::new();
        for request in requests {
            *identifier_kinds
                .entry(IdentifierKind::from_identifier(&request.identifier))
                .or_default() += 1;
        }
        let voters: Vec<f64> = requests.iter().filter_map(|r| r.num_voters).map(f64::from).collect();

        Some(Self {
            total_requests: requests.len(),
            identifier_kinds,
            avg_voters_per_request: mean(&voters),
            yes_no: yes_no_summary(requests),
            voters: uma_voter_stats(votes),
        })
    }
}

fn yes_no_summary(requests: &[UmaRequest]) -> Option<YesNoSummary> {
    let queries: Vec<&UmaRequest> = requests
        .iter()
        .filter(|r| IdentifierKind::from_identifier(&r.identifier) == IdentifierKind::YesOrNoQuery)
        .collect();
    if queries.is_empty() {
        return None;
    }

    let mut resolution_distribution: BTreeMap<String, usize> = BTreeMap::new();
    for q in &queries {
        let label = q.resolution_label.as_deref().unwrap_or("Unknown");
        *resolution_distribution.entry(label.to_string()).or_default() += 1;
    }
    let count = |label: &str| resolution_distribution.get(label).copied().unwrap_or(0);
    let voters: Vec<u32> = queries.iter().filter_map(|q| q.num_voters).collect();
    let rates: Vec<f64> = queries.iter().filter_map(|q| q.consensus_rate).collect();

    Some(YesNoSummary {
        total: queries.len(),
        yes_count: count("Yes"),
        no_count: count("No"),
        indeterminate_count: count("Indeterminate"),
        unresolvable_count: count("Unresolvable"),
        avg_voters: mean(&voters.iter().copied().map(f64::from).collect::<Vec<_>>()),
        min_voters: voters.iter().copied().min(),
        max_voters: voters.iter().copied().max(),
        consensus: ConsensusStats::from_rates(&rates),
        resolution_distribution,
    })
}

fn uma_voter_stats(votes: &[UmaVote]) -> Option<UmaVoterStats> {
    if votes.is_empty() {
        return None;
    }
    let mut rounds: HashMap<&str, HashSet<u64>> = HashMap::new();
    let mut tokens: HashMap<&str, f64> = HashMap::new();
    for vote in votes {
        rounds.entry(&vote.voter).or_default().insert(vote.round_id);
        *tokens.entry(&vote.voter).or_default() += vote.num_tokens;
    }

    let mut ranked: Vec<(&str, f64)> = tokens.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    let total: f64 = ranked.iter().map(|(_, t)| t).sum();
    let share = |n: usize| {
        (total > 0.0).then(|| ranked.iter().take(n).map(|(_, t)| t).sum::<f64>() / total * 100.0)
    };

    let repeat_voters = rounds.values().filter(|r| r.len() > 1).count();
    Some(UmaVoterStats {
        unique_voters: rounds.len(),
        repeat_voters,
        repeat_voter_ratio: percent(repeat_voters, rounds.len()),
        top5_token_share: share(5),
        top10_token_share: share(10),
        top_voters: ranked
            .iter()
            .take(TOP_PARTICIPANTS)
            .map(|(address, t)| TopVoter {
                address: (*address).to_string(),
                tokens: *t,
                token_share: if total > 0.0 { t / total * 100.0 } else { 0.0 },
                rounds: rounds.get(address).map_or(0, HashSet::len),
            })
            .collect(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopJuror {
    pub address: String,
    pub votes: usize,
    pub disputes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JurorStats {
    pub unique_jurors: usize,
    /// Jurors who voted in more than one dispute.
    pub repeat_jurors: usize,
    pub repeat_juror_ratio: f64,
    pub top_jurors: Vec<TopJuror>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KlerosDisputeSummary {
    pub total_disputes: usize,
    /// Disputes with a ruling above 0.
    pub resolved_count: usize,
    pub unresolved_count: usize,
    pub resolution_rate: f64,
    pub ruling_distribution: BTreeMap<u32, usize>,
    pub avg_jurors_per_dispute: Option<f64>,
    pub avg_votes_per_dispute: Option<f64>,
    /// Over disputes with a positive consensus rate.
    pub consensus: Option<ConsensusStats>,
    /// Disputes appealed at least once.
    pub appeal_rate: f64,
    /// `None` without vote records.
    pub jurors: Option<JurorStats>,
}

impl KlerosDisputeSummary {
    /// `None` for an empty dispute list.
    #[must_use]
    pub fn compute(disputes: &[KlerosDispute], votes: &[KlerosVote]) -> Option<Self> {
        if disputes.is_empty() {
            return None;
        }
        let total = disputes.len();
        let mut ruling_distribution = BTreeMap::new();
        for ruling in disputes.iter().filter_map(|d| d.ruling).filter(|r| *r > 0) {
            *ruling_distribution.entry(ruling).or_default() += 1;
        }
        let resolved_count: usize = ruling_distribution.values().sum();

        let jurors: Vec<f64> = disputes.iter().filter_map(|d| d.num_jurors_drawn).map(f64::from).collect();
        let vote_counts: Vec<f64> = disputes.iter().filter_map(|d| d.num_votes).map(f64::from).collect();
        let rates: Vec<f64> = disputes
            .iter()
            .filter_map(|d| d.consensus_rate)
            .filter(|r| *r > 0.0)
            .collect();
        let appealed = disputes.iter().filter(|d| d.num_appeals.unwrap_or(0) > 0).count();

        Some(Self {
            total_disputes: total,
            resolved_count,
            unresolved_count: total - resolved_count,
            resolution_rate: percent(resolved_count, total),
            ruling_distribution,
            avg_jurors_per_dispute: mean(&jurors),
            avg_votes_per_dispute: mean(&vote_counts),
            consensus: ConsensusStats::from_rates(&rates),
            appeal_rate: percent(appealed, total),
            jurors: juror_stats(votes),
        })
    }
}

fn juror_stats(votes: &[KlerosVote]) -> Option<JurorStats> {
    if votes.is_empty() {
        return None;
    }
    let mut disputes: HashMap<&str, HashSet<u64>> = HashMap::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for vote in votes {
        disputes.entry(&vote.voter).or_default().insert(vote.dispute_id);
        *counts.entry(&vote.voter).or_default() += 1;
    }
    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let repeat_jurors = disputes.values().filter(|d| d.len() > 1).count();
    Some(JurorStats {
        unique_jurors: disputes.len(),
        repeat_jurors,
        repeat_juror_ratio: percent(repeat_jurors, disputes.len()),
        top_jurors: ranked
            .iter()
            .take(TOP_PARTICIPANTS)
            .map(|(address, votes)| TopJuror {
                address: (*address).to_string(),
                votes: *votes,
                disputes: disputes.get(address).map_or(0, HashSet::len),
            })
            .collect(),
    })
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

fn percent(part: usize, whole: usize) -> f64 {
    part as f64 / whole.max(1) as f64 * 100.0
}
