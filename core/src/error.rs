use thiserror::Error;

use crate::types::{ExplorationId, NodeId};

#[derive(Error, Debug)]
pub enum ExploreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {field} {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("Exploration '{id}' not found")]
    ExplorationNotFound { id: ExplorationId },

    #[error("Experiment '{id}' not found")]
    ExperimentNotFound { id: String },

    #[error("Node {id} not found")]
    NodeNotFound { id: NodeId },

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error(transparent)]
    Proposal(#[from] ProposalError),

    #[error(transparent)]
    Simulation(#[from] SimulationError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type ExploreResult<T> = Result<T, ExploreError>;

/// Failures of one Action Proposer call. Recovered per node.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProposalError {
    #[error("proposer returned no candidates")]
    Empty,

    #[error("proposer call failed: {0}")]
    Failed(String),

    #[error("LLM call budget exhausted")]
    BudgetExhausted,
}

/// Failures of one node's simulation. Recovered per node.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    #[error("malformed scorecard: {dimension} = {value}")]
    MalformedScorecard { dimension: &'static str, value: f64 },

    #[error("no simulatable individuals ({skipped} skipped)")]
    EmptyPopulation { skipped: usize },

    #[error("n_trials must be > 0")]
    NoTrials,
}
