//! Exploration event log.
//!
//! RULE: The scheduler records every node creation, status change and
//! depth-level decision here, so a finished tree can be audited without
//! re-running it. Variants are only ever appended.

use crate::{
    exploration::{ExplorationStatus, NodeStatus},
    types::{ExperimentId, ExplorationId, NodeId},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExplorationEvent {
    ExplorationStarted {
        experiment_id: ExperimentId,
        goal:          f64,
        beam_width:    u32,
        max_depth:     u32,
    },
    NodeCreated {
        node_id:      NodeId,
        parent_id:    Option<NodeId>,
        depth:        u32,
        success_rate: Option<f64>,
    },
    NodeStatusChanged {
        node_id: NodeId,
        status:  NodeStatus,
        reason:  Option<String>,
    },
    DepthCompleted {
        depth:    u32,
        retained: Vec<NodeId>,
        pruned:   Vec<NodeId>,
        failed:   Vec<NodeId>,
    },
    ExplorationTerminated {
        status:            ExplorationStatus,
        best_success_rate: f64,
    },
}

impl ExplorationEvent {
    /// Stable name for the event_type column.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::ExplorationStarted { .. } => "exploration_started",
            Self::NodeCreated { .. } => "node_created",
            Self::NodeStatusChanged { .. } => "node_status_changed",
            Self::DepthCompleted { .. } => "depth_completed",
            Self::ExplorationTerminated { .. } => "exploration_terminated",
        }
    }
}

/// The event log entry as persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventLogEntry {
    pub id:             Option<i64>,
    pub exploration_id: ExplorationId,
    pub depth:          u32,
    pub event_type:     String,
    pub payload:        String, // JSON-serialized ExplorationEvent
}

impl EventLogEntry {
    pub fn decode(&self) -> serde_json::Result<ExplorationEvent> {
        serde_json::from_str(&self.payload)
    }
}
