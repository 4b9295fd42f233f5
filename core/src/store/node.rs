use super::ExploreStore;
use crate::{
    error::{ExploreError, ExploreResult},
    exploration::{NewNode, NodeStatus, ScenarioNode},
    proposer::ActionCategory,
    simulator::SimulationResult,
    types::NodeId,
};
use rusqlite::{params, OptionalExtension, Row};

const NODE_COLUMNS: &str = "node_id, exploration_id, parent_id, depth, action, category,
                            scorecard_json, simulation_json, node_status, failure_reason";

/// Raw column values; JSON and enum columns are decoded after the query.
struct NodeRow {
    node_id:         NodeId,
    exploration_id:  String,
    parent_id:       Option<NodeId>,
    depth:           u32,
    action:          Option<String>,
    category:        Option<String>,
    scorecard_json:  String,
    simulation_json: Option<String>,
    node_status:     String,
    failure_reason:  Option<String>,
}

impl NodeRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            node_id: row.get(0)?,
            exploration_id: row.get(1)?,
            parent_id: row.get(2)?,
            depth: row.get(3)?,
            action: row.get(4)?,
            category: row.get(5)?,
            scorecard_json: row.get(6)?,
            simulation_json: row.get(7)?,
            node_status: row.get(8)?,
            failure_reason: row.get(9)?,
        })
    }

    fn decode(self) -> ExploreResult<ScenarioNode> {
        let node_status = NodeStatus::parse(&self.node_status).ok_or_else(|| {
            ExploreError::Other(anyhow::anyhow!("unknown node status '{}'", self.node_status))
        })?;
        Ok(ScenarioNode {
            node_id: self.node_id,
            exploration_id: self.exploration_id,
            parent_id: self.parent_id,
            depth: self.depth,
            action: self.action,
            category: self.category.as_deref().map(ActionCategory::parse),
            scorecard: serde_json::from_str(&self.scorecard_json)?,
            simulation_results: self
                .simulation_json
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?,
            node_status,
            failure_reason: self.failure_reason,
        })
    }
}

impl ExploreStore {
    // ── Scenario nodes ─────────────────────────────────────────

    pub fn create_node(&self, node: &NewNode) -> ExploreResult<NodeId> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO scenario_node (
                exploration_id, parent_id, depth, action, category, scorecard_json, node_status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'active')",
            params![
                node.exploration_id,
                node.parent_id,
                node.depth,
                node.action,
                node.category.map(|c| c.as_str()),
                serde_json::to_string(&node.scorecard)?,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn update_status(
        &self,
        node_id: NodeId,
        status: NodeStatus,
        reason: Option<&str>,
    ) -> ExploreResult<()> {
        let updated = self.conn.lock().execute(
            "UPDATE scenario_node
             SET node_status = ?1, failure_reason = COALESCE(?2, failure_reason)
             WHERE node_id = ?3",
            params![status.as_str(), reason, node_id],
        )?;
        if updated == 0 {
            return Err(ExploreError::NodeNotFound { id: node_id });
        }
        Ok(())
    }

    pub fn save_simulation_result(
        &self,
        node_id: NodeId,
        result: &SimulationResult,
    ) -> ExploreResult<()> {
        let updated = self.conn.lock().execute(
            "UPDATE scenario_node SET simulation_json = ?1 WHERE node_id = ?2",
            params![serde_json::to_string(result)?, node_id],
        )?;
        if updated == 0 {
            return Err(ExploreError::NodeNotFound { id: node_id });
        }
        Ok(())
    }

    pub fn get_node(&self, node_id: NodeId) -> ExploreResult<ScenarioNode> {
        let row = self
            .conn
            .lock()
            .query_row(
                &format!("SELECT {NODE_COLUMNS} FROM scenario_node WHERE node_id = ?1"),
                params![node_id],
                NodeRow::from_row,
            )
            .optional()?
            .ok_or(ExploreError::NodeNotFound { id: node_id })?;
        row.decode()
    }

    pub fn get_active_nodes(&self, exploration_id: &str, depth: u32) -> ExploreResult<Vec<ScenarioNode>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {NODE_COLUMNS} FROM scenario_node
             WHERE exploration_id = ?1 AND depth = ?2 AND node_status = 'active'
             ORDER BY node_id ASC"
        ))?;
        let rows = stmt
            .query_map(params![exploration_id, depth], NodeRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(NodeRow::decode).collect()
    }

    pub fn get_tree(&self, exploration_id: &str) -> ExploreResult<Vec<ScenarioNode>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {NODE_COLUMNS} FROM scenario_node
             WHERE exploration_id = ?1
             ORDER BY node_id ASC"
        ))?;
        let rows = stmt
            .query_map(params![exploration_id], NodeRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(NodeRow::decode).collect()
    }
}
