use super::ExploreStore;
use crate::{
    error::ExploreResult,
    event::{EventLogEntry, ExplorationEvent},
};
use rusqlite::params;

impl ExploreStore {
    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(
        &self,
        exploration_id: &str,
        depth: u32,
        event: &ExplorationEvent,
    ) -> ExploreResult<()> {
        self.conn.lock().execute(
            "INSERT INTO event_log (exploration_id, depth, event_type, payload)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                exploration_id,
                depth,
                event.type_name(),
                serde_json::to_string(event)?,
            ],
        )?;
        Ok(())
    }

    pub fn events(&self, exploration_id: &str) -> ExploreResult<Vec<EventLogEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, exploration_id, depth, event_type, payload
             FROM event_log WHERE exploration_id = ?1
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![exploration_id], |row| {
                Ok(EventLogEntry {
                    id: Some(row.get(0)?),
                    exploration_id: row.get(1)?,
                    depth: row.get(2)?,
                    event_type: row.get(3)?,
                    payload: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}
