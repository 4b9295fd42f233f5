//! Exploration records, scenario nodes and winning-path reconstruction.
//!
//! RULE: The tree is an append-only arena keyed by NodeId.
//! Nodes point at their parent by id; nothing holds child pointers.
//! Nodes are never deleted; only their status changes.

use crate::{
    config::ExplorationParams,
    error::{ExploreError, ExploreResult},
    proposer::ActionCategory,
    scorecard::Scorecard,
    simulator::SimulationResult,
    traits::Individual,
    types::{ExperimentId, ExplorationId, NodeId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An experiment as the engine needs it: a baseline scenario and its cohort.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Experiment {
    pub experiment_id: ExperimentId,
    pub label:         String,
    pub baseline:      Scorecard,
    pub population:    Vec<Individual>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Active,
    Winner,
    Dominated,
    ExpansionFailed,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Winner => "winner",
            Self::Dominated => "dominated",
            Self::ExpansionFailed => "expansion_failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "winner" => Some(Self::Winner),
            "dominated" => Some(Self::Dominated),
            "expansion_failed" => Some(Self::ExpansionFailed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioNode {
    pub node_id:            NodeId,
    pub exploration_id:     ExplorationId,
    /// None for the root (baseline) node.
    pub parent_id:          Option<NodeId>,
    pub depth:              u32,
    /// None at the root and on placeholder failure nodes.
    pub action:             Option<String>,
    pub category:           Option<ActionCategory>,
    pub scorecard:          Scorecard,
    pub simulation_results: Option<SimulationResult>,
    pub node_status:        NodeStatus,
    pub failure_reason:     Option<String>,
}

impl ScenarioNode {
    pub fn success_rate(&self) -> Option<f64> {
        self.simulation_results.as_ref().map(|r| r.success_rate)
    }
}

/// Fields supplied when appending a node; the repository assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNode {
    pub exploration_id: ExplorationId,
    pub parent_id:      Option<NodeId>,
    pub depth:          u32,
    pub action:         Option<String>,
    pub category:       Option<ActionCategory>,
    pub scorecard:      Scorecard,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExplorationStatus {
    Pending,
    Running,
    GoalAchieved,
    DepthExhausted,
    LlmBudgetExhausted,
    Failed,
}

impl ExplorationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::GoalAchieved => "goal_achieved",
            Self::DepthExhausted => "depth_exhausted",
            Self::LlmBudgetExhausted => "llm_budget_exhausted",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "goal_achieved" => Some(Self::GoalAchieved),
            "depth_exhausted" => Some(Self::DepthExhausted),
            "llm_budget_exhausted" => Some(Self::LlmBudgetExhausted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }

    /// pending → running → exactly one terminal status.
    pub fn can_transition_to(&self, next: ExplorationStatus) -> bool {
        match self {
            Self::Pending => next == Self::Running,
            Self::Running => next.is_terminal(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Exploration {
    pub exploration_id:    ExplorationId,
    pub experiment_id:     ExperimentId,
    pub goal:              f64,
    pub beam_width:        u32,
    pub max_depth:         u32,
    pub max_llm_calls:     u32,
    pub status:            ExplorationStatus,
    pub current_depth:     u32,
    pub total_nodes:       u32,
    pub total_llm_calls:   u32,
    pub best_success_rate: f64,
    pub created_at:        DateTime<Utc>,
    pub completed_at:      Option<DateTime<Utc>>,
}

impl Exploration {
    pub fn new(exploration_id: ExplorationId, experiment_id: ExperimentId, params: &ExplorationParams) -> Self {
        Self {
            exploration_id,
            experiment_id,
            goal: params.goal_value,
            beam_width: params.beam_width,
            max_depth: params.max_depth,
            max_llm_calls: params.max_llm_calls,
            status: ExplorationStatus::Pending,
            current_depth: 0,
            total_nodes: 0,
            total_llm_calls: 0,
            best_success_rate: 0.0,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn transition(&mut self, next: ExplorationStatus) -> ExploreResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(ExploreError::InvalidTransition {
                from: self.status.as_str().into(),
                to: next.as_str().into(),
            });
        }
        self.status = next;
        if next.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Monotonic: the best rate never decreases.
    pub fn observe_success_rate(&mut self, rate: f64) {
        if rate > self.best_success_rate {
            self.best_success_rate = rate;
        }
    }

    pub fn llm_budget_left(&self) -> u32 {
        self.max_llm_calls.saturating_sub(self.total_llm_calls)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathStep {
    pub node_id:            NodeId,
    pub depth:              u32,
    pub action:             Option<String>,
    pub category:           Option<ActionCategory>,
    pub success_rate:       f64,
    pub delta_success_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WinningPath {
    /// Root first, winner last.
    pub steps:             Vec<PathStep>,
    pub total_improvement: f64,
}

impl WinningPath {
    /// Walk parent links from `winner_id` back to the root.
    pub fn from_tree(tree: &[ScenarioNode], winner_id: NodeId) -> ExploreResult<Self> {
        let by_id: HashMap<NodeId, &ScenarioNode> = tree.iter().map(|n| (n.node_id, n)).collect();

        let mut steps = Vec::new();
        let mut cursor = Some(winner_id);
        while let Some(id) = cursor {
            let node = by_id.get(&id).ok_or(ExploreError::NodeNotFound { id })?;
            steps.push(PathStep {
                node_id: node.node_id,
                depth: node.depth,
                action: node.action.clone(),
                category: node.category,
                success_rate: node.success_rate().unwrap_or(0.0),
                delta_success_rate: node
                    .simulation_results
                    .as_ref()
                    .and_then(|r| r.delta_success_rate),
            });
            if steps.len() > tree.len() {
                return Err(ExploreError::Other(anyhow::anyhow!(
                    "parent cycle detected at node {id}"
                )));
            }
            cursor = node.parent_id;
        }
        steps.reverse();

        let root_rate = steps.first().map(|s| s.success_rate).unwrap_or(0.0);
        let winner_rate = steps.last().map(|s| s.success_rate).unwrap_or(0.0);
        Ok(Self {
            steps,
            total_improvement: winner_rate - root_rate,
        })
    }
}
