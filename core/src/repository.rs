//! Node Repository: the narrow persistence contract the scheduler uses.
//!
//! RULE: Writes are append-only. Nodes and events are never deleted;
//! status and simulation results are the only fields updated in place.
//! Readers therefore never observe a torn tree.
//!
//! Two implementations: InMemoryRepository (arena, this file) and
//! ExploreStore (SQLite, store/).

use crate::{
    error::{ExploreError, ExploreResult},
    event::{EventLogEntry, ExplorationEvent},
    exploration::{Experiment, Exploration, NewNode, NodeStatus, ScenarioNode},
    simulator::SimulationResult,
    types::NodeId,
};
use parking_lot::RwLock;
use std::collections::HashMap;

pub trait NodeRepository: Send + Sync {
    // ── Experiments ────────────────────────────────────────────
    fn insert_experiment(&self, experiment: &Experiment) -> ExploreResult<()>;
    fn get_experiment(&self, experiment_id: &str) -> ExploreResult<Experiment>;

    // ── Explorations ───────────────────────────────────────────
    fn insert_exploration(&self, exploration: &Exploration) -> ExploreResult<()>;
    fn save_exploration(&self, exploration: &Exploration) -> ExploreResult<()>;
    fn get_exploration(&self, exploration_id: &str) -> ExploreResult<Exploration>;

    // ── Nodes ──────────────────────────────────────────────────
    /// Append an `active` node without results. Ids increase in creation order.
    fn create_node(&self, node: &NewNode) -> ExploreResult<NodeId>;
    fn update_status(&self, node_id: NodeId, status: NodeStatus, reason: Option<&str>) -> ExploreResult<()>;
    fn save_simulation_result(&self, node_id: NodeId, result: &SimulationResult) -> ExploreResult<()>;
    fn get_node(&self, node_id: NodeId) -> ExploreResult<ScenarioNode>;
    /// Active nodes at one depth, oldest first.
    fn get_active_nodes(&self, exploration_id: &str, depth: u32) -> ExploreResult<Vec<ScenarioNode>>;
    /// The full materialized tree, oldest first.
    fn get_tree(&self, exploration_id: &str) -> ExploreResult<Vec<ScenarioNode>>;

    // ── Event log ──────────────────────────────────────────────
    fn append_event(&self, exploration_id: &str, depth: u32, event: &ExplorationEvent) -> ExploreResult<()>;
    fn events(&self, exploration_id: &str) -> ExploreResult<Vec<EventLogEntry>>;
}

#[derive(Default)]
struct Arena {
    experiments:  HashMap<String, Experiment>,
    explorations: HashMap<String, Exploration>,
    /// nodes[i] has NodeId i + 1.
    nodes:        Vec<ScenarioNode>,
    events:       Vec<EventLogEntry>,
}

impl Arena {
    fn node(&self, node_id: NodeId) -> ExploreResult<&ScenarioNode> {
        node_id
            .checked_sub(1)
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| self.nodes.get(i))
            .ok_or(ExploreError::NodeNotFound { id: node_id })
    }

    fn node_mut(&mut self, node_id: NodeId) -> ExploreResult<&mut ScenarioNode> {
        node_id
            .checked_sub(1)
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| self.nodes.get_mut(i))
            .ok_or(ExploreError::NodeNotFound { id: node_id })
    }
}

/// Arena-backed repository for tests and ephemeral runs.
#[derive(Default)]
pub struct InMemoryRepository {
    arena: RwLock<Arena>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NodeRepository for InMemoryRepository {
    fn insert_experiment(&self, experiment: &Experiment) -> ExploreResult<()> {
        self.arena
            .write()
            .experiments
            .insert(experiment.experiment_id.clone(), experiment.clone());
        Ok(())
    }

    fn get_experiment(&self, experiment_id: &str) -> ExploreResult<Experiment> {
        self.arena
            .read()
            .experiments
            .get(experiment_id)
            .cloned()
            .ok_or_else(|| ExploreError::ExperimentNotFound { id: experiment_id.into() })
    }

    fn insert_exploration(&self, exploration: &Exploration) -> ExploreResult<()> {
        self.arena
            .write()
            .explorations
            .insert(exploration.exploration_id.clone(), exploration.clone());
        Ok(())
    }

    fn save_exploration(&self, exploration: &Exploration) -> ExploreResult<()> {
        let mut arena = self.arena.write();
        let slot = arena
            .explorations
            .get_mut(&exploration.exploration_id)
            .ok_or_else(|| ExploreError::ExplorationNotFound { id: exploration.exploration_id.clone() })?;
        *slot = exploration.clone();
        Ok(())
    }

    fn get_exploration(&self, exploration_id: &str) -> ExploreResult<Exploration> {
        self.arena
            .read()
            .explorations
            .get(exploration_id)
            .cloned()
            .ok_or_else(|| ExploreError::ExplorationNotFound { id: exploration_id.into() })
    }

    fn create_node(&self, node: &NewNode) -> ExploreResult<NodeId> {
        let mut arena = self.arena.write();
        let node_id = arena.nodes.len() as NodeId + 1;
        arena.nodes.push(ScenarioNode {
            node_id,
            exploration_id: node.exploration_id.clone(),
            parent_id: node.parent_id,
            depth: node.depth,
            action: node.action.clone(),
            category: node.category,
            scorecard: node.scorecard,
            simulation_results: None,
            node_status: NodeStatus::Active,
            failure_reason: None,
        });
        Ok(node_id)
    }

    fn update_status(&self, node_id: NodeId, status: NodeStatus, reason: Option<&str>) -> ExploreResult<()> {
        let mut arena = self.arena.write();
        let node = arena.node_mut(node_id)?;
        node.node_status = status;
        if let Some(r) = reason {
            node.failure_reason = Some(r.to_string());
        }
        Ok(())
    }

    fn save_simulation_result(&self, node_id: NodeId, result: &SimulationResult) -> ExploreResult<()> {
        let mut arena = self.arena.write();
        arena.node_mut(node_id)?.simulation_results = Some(result.clone());
        Ok(())
    }

    fn get_node(&self, node_id: NodeId) -> ExploreResult<ScenarioNode> {
        self.arena.read().node(node_id).cloned()
    }

    fn get_active_nodes(&self, exploration_id: &str, depth: u32) -> ExploreResult<Vec<ScenarioNode>> {
        Ok(self
            .arena
            .read()
            .nodes
            .iter()
            .filter(|n| {
                n.exploration_id == exploration_id
                    && n.depth == depth
                    && n.node_status == NodeStatus::Active
            })
            .cloned()
            .collect())
    }

    fn get_tree(&self, exploration_id: &str) -> ExploreResult<Vec<ScenarioNode>> {
        Ok(self
            .arena
            .read()
            .nodes
            .iter()
            .filter(|n| n.exploration_id == exploration_id)
            .cloned()
            .collect())
    }

    fn append_event(&self, exploration_id: &str, depth: u32, event: &ExplorationEvent) -> ExploreResult<()> {
        let mut arena = self.arena.write();
        let id = arena.events.len() as i64 + 1;
        arena.events.push(EventLogEntry {
            id: Some(id),
            exploration_id: exploration_id.to_string(),
            depth,
            event_type: event.type_name().to_string(),
            payload: serde_json::to_string(event)?,
        });
        Ok(())
    }

    fn events(&self, exploration_id: &str) -> ExploreResult<Vec<EventLogEntry>> {
        Ok(self
            .arena
            .read()
            .events
            .iter()
            .filter(|e| e.exploration_id == exploration_id)
            .cloned()
            .collect())
    }
}
