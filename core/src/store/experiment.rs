use super::{format_ts, parse_ts, ExploreStore};
use crate::{
    error::{ExploreError, ExploreResult},
    exploration::{Experiment, Exploration, ExplorationStatus},
};
use rusqlite::{params, OptionalExtension};

impl ExploreStore {
    // ── Experiment ─────────────────────────────────────────────

    pub fn insert_experiment(&self, e: &Experiment) -> ExploreResult<()> {
        self.conn.lock().execute(
            "INSERT INTO experiment (experiment_id, label, baseline_json, population_json)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(experiment_id) DO UPDATE SET
                label = excluded.label,
                baseline_json = excluded.baseline_json,
                population_json = excluded.population_json",
            params![
                e.experiment_id,
                e.label,
                serde_json::to_string(&e.baseline)?,
                serde_json::to_string(&e.population)?,
            ],
        )?;
        Ok(())
    }

    pub fn get_experiment(&self, experiment_id: &str) -> ExploreResult<Experiment> {
        let row: Option<(String, String, String)> = self
            .conn
            .lock()
            .query_row(
                "SELECT label, baseline_json, population_json
                 FROM experiment WHERE experiment_id = ?1",
                params![experiment_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        let (label, baseline, population) =
            row.ok_or_else(|| ExploreError::ExperimentNotFound { id: experiment_id.into() })?;
        Ok(Experiment {
            experiment_id: experiment_id.to_string(),
            label,
            baseline: serde_json::from_str(&baseline)?,
            population: serde_json::from_str(&population)?,
        })
    }

    // ── Exploration ────────────────────────────────────────────

    pub fn insert_exploration(&self, x: &Exploration) -> ExploreResult<()> {
        self.conn.lock().execute(
            "INSERT INTO exploration (
                exploration_id, experiment_id, goal, beam_width, max_depth, max_llm_calls,
                status, current_depth, total_nodes, total_llm_calls, best_success_rate,
                created_at, completed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                x.exploration_id,
                x.experiment_id,
                x.goal,
                x.beam_width,
                x.max_depth,
                x.max_llm_calls,
                x.status.as_str(),
                x.current_depth,
                x.total_nodes,
                x.total_llm_calls,
                x.best_success_rate,
                format_ts(&x.created_at),
                x.completed_at.as_ref().map(format_ts),
            ],
        )?;
        Ok(())
    }

    pub fn save_exploration(&self, x: &Exploration) -> ExploreResult<()> {
        let updated = self.conn.lock().execute(
            "UPDATE exploration SET
                status = ?1, current_depth = ?2, total_nodes = ?3, total_llm_calls = ?4,
                best_success_rate = ?5, completed_at = ?6
             WHERE exploration_id = ?7",
            params![
                x.status.as_str(),
                x.current_depth,
                x.total_nodes,
                x.total_llm_calls,
                x.best_success_rate,
                x.completed_at.as_ref().map(format_ts),
                x.exploration_id,
            ],
        )?;
        if updated == 0 {
            return Err(ExploreError::ExplorationNotFound { id: x.exploration_id.clone() });
        }
        Ok(())
    }

    pub fn get_exploration(&self, exploration_id: &str) -> ExploreResult<Exploration> {
        let row = self
            .conn
            .lock()
            .query_row(
                "SELECT experiment_id, goal, beam_width, max_depth, max_llm_calls, status,
                        current_depth, total_nodes, total_llm_calls, best_success_rate,
                        created_at, completed_at
                 FROM exploration WHERE exploration_id = ?1",
                params![exploration_id],
                |row| {
                    Ok(ExplorationRow {
                        experiment_id: row.get(0)?,
                        goal: row.get(1)?,
                        beam_width: row.get(2)?,
                        max_depth: row.get(3)?,
                        max_llm_calls: row.get(4)?,
                        status: row.get(5)?,
                        current_depth: row.get(6)?,
                        total_nodes: row.get(7)?,
                        total_llm_calls: row.get(8)?,
                        best_success_rate: row.get(9)?,
                        created_at: row.get(10)?,
                        completed_at: row.get(11)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| ExploreError::ExplorationNotFound { id: exploration_id.into() })?;

        let status = ExplorationStatus::parse(&row.status).ok_or_else(|| {
            ExploreError::Other(anyhow::anyhow!("unknown exploration status '{}'", row.status))
        })?;
        Ok(Exploration {
            exploration_id: exploration_id.to_string(),
            experiment_id: row.experiment_id,
            goal: row.goal,
            beam_width: row.beam_width,
            max_depth: row.max_depth,
            max_llm_calls: row.max_llm_calls,
            status,
            current_depth: row.current_depth,
            total_nodes: row.total_nodes,
            total_llm_calls: row.total_llm_calls,
            best_success_rate: row.best_success_rate,
            created_at: parse_ts(&row.created_at)?,
            completed_at: row.completed_at.as_deref().map(parse_ts).transpose()?,
        })
    }
}

struct ExplorationRow {
    experiment_id:     String,
    goal:              f64,
    beam_width:        u32,
    max_depth:         u32,
    max_llm_calls:     u32,
    status:            String,
    current_depth:     u32,
    total_nodes:       u32,
    total_llm_calls:   u32,
    best_success_rate: f64,
    created_at:        String,
    completed_at:      Option<String>,
}
