//! SQLite persistence layer.
//!
//! RULE: Only store/ talks to the database.
//! The scheduler reaches it through the NodeRepository trait and never
//! executes SQL directly.

mod event;
mod experiment;
mod node;

use crate::{
    error::{ExploreError, ExploreResult},
    event::{EventLogEntry, ExplorationEvent},
    exploration::{Experiment, Exploration, NewNode, NodeStatus, ScenarioNode},
    repository::NodeRepository,
    simulator::SimulationResult,
    types::NodeId,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::Connection;

pub struct ExploreStore {
    conn: Mutex<Connection>,
}

impl ExploreStore {
    pub fn open(path: &str) -> ExploreResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> ExploreResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> ExploreResult<()> {
        self.conn
            .lock()
            .execute_batch(include_str!("../../../migrations/001_exploration.sql"))?;
        Ok(())
    }
}

fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

fn parse_ts(raw: &str) -> ExploreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| ExploreError::Other(anyhow::anyhow!("bad timestamp '{raw}': {e}")))
}

impl NodeRepository for ExploreStore {
    fn insert_experiment(&self, experiment: &Experiment) -> ExploreResult<()> {
        ExploreStore::insert_experiment(self, experiment)
    }

    fn get_experiment(&self, experiment_id: &str) -> ExploreResult<Experiment> {
        ExploreStore::get_experiment(self, experiment_id)
    }

    fn insert_exploration(&self, exploration: &Exploration) -> ExploreResult<()> {
        ExploreStore::insert_exploration(self, exploration)
    }

    fn save_exploration(&self, exploration: &Exploration) -> ExploreResult<()> {
        ExploreStore::save_exploration(self, exploration)
    }

    fn get_exploration(&self, exploration_id: &str) -> ExploreResult<Exploration> {
        ExploreStore::get_exploration(self, exploration_id)
    }

    fn create_node(&self, node: &NewNode) -> ExploreResult<NodeId> {
        ExploreStore::create_node(self, node)
    }

    fn update_status(&self, node_id: NodeId, status: NodeStatus, reason: Option<&str>) -> ExploreResult<()> {
        ExploreStore::update_status(self, node_id, status, reason)
    }

    fn save_simulation_result(&self, node_id: NodeId, result: &SimulationResult) -> ExploreResult<()> {
        ExploreStore::save_simulation_result(self, node_id, result)
    }

    fn get_node(&self, node_id: NodeId) -> ExploreResult<ScenarioNode> {
        ExploreStore::get_node(self, node_id)
    }

    fn get_active_nodes(&self, exploration_id: &str, depth: u32) -> ExploreResult<Vec<ScenarioNode>> {
        ExploreStore::get_active_nodes(self, exploration_id, depth)
    }

    fn get_tree(&self, exploration_id: &str) -> ExploreResult<Vec<ScenarioNode>> {
        ExploreStore::get_tree(self, exploration_id)
    }

    fn append_event(&self, exploration_id: &str, depth: u32, event: &ExplorationEvent) -> ExploreResult<()> {
        ExploreStore::append_event(self, exploration_id, depth, event)
    }

    fn events(&self, exploration_id: &str) -> ExploreResult<Vec<EventLogEntry>> {
        ExploreStore::events(self, exploration_id)
    }
}
