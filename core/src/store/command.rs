use super::TowerStore;
use crate::{command::OperatorCommand, config::IssueStatus, error::TowerResult, types::Tick};
use rusqlite::{params, OptionalExtension};

impl TowerStore {
    // ── Operator commands ─────────────────────────────────────────

    pub fn insert_command(
        &self,
        run_id: &str,
        tick: Tick,
        command: &OperatorCommand,
    ) -> TowerResult<i64> {
        let payload = serde_json::to_string(command)?;
        self.conn.execute(
            "INSERT INTO operator_command (run_id, tick, cmd_type, payload)
             VALUES (?1, ?2, ?3, ?4)",
            params![run_id, tick as i64, command.type_name(), payload],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_command(&self, run_id: &str, command_id: i64) -> TowerResult<Option<OperatorCommand>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM operator_command WHERE id = ?1 AND run_id = ?2",
                params![command_id, run_id],
                |row| row.get(0),
            )
            .optional()?;

        match payload {
            Some(p) => Ok(Some(serde_json::from_str(&p)?)),
            None => Ok(None),
        }
    }

    pub fn mark_command_applied(&self, command_id: i64, tick: Tick) -> TowerResult<()> {
        self.conn.execute(
            "UPDATE operator_command SET applied_tick = ?1 WHERE id = ?2",
            params![tick as i64, command_id],
        )?;
        Ok(())
    }

    /// Commands submitted but not yet applied, oldest first.
    pub fn pending_commands(&self, run_id: &str) -> TowerResult<Vec<(i64, OperatorCommand)>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, payload FROM operator_command
             WHERE run_id = ?1 AND applied_tick IS NULL
             ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|(id, payload)| -> TowerResult<(i64, OperatorCommand)> {
                Ok((id, serde_json::from_str(&payload)?))
            })
            .collect()
    }

    // ── Issue state ───────────────────────────────────────────────

    pub fn upsert_issue_status(
        &self,
        run_id: &str,
        issue_id: &str,
        status: IssueStatus,
        tick: Tick,
    ) -> TowerResult<()> {
        self.conn.execute(
            "INSERT INTO issue_state (run_id, issue_id, status, updated_tick)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(run_id, issue_id)
             DO UPDATE SET status = excluded.status, updated_tick = excluded.updated_tick",
            params![run_id, issue_id, status.as_str(), tick as i64],
        )?;
        Ok(())
    }

    /// Stored statuses. Rows with an unrecognised status are skipped.
    pub fn issue_statuses(&self, run_id: &str) -> TowerResult<Vec<(String, IssueStatus)>> {
        let mut stmt = self.conn.prepare(
            "SELECT issue_id, status FROM issue_state WHERE run_id = ?1 ORDER BY issue_id",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows
            .into_iter()
            .filter_map(|(id, status)| match IssueStatus::parse(&status) {
                Some(s) => Some((id, s)),
                None => {
                    log::warn!("store: issue {id} has unknown status '{status}'");
                    None
                }
            })
            .collect())
    }
}
