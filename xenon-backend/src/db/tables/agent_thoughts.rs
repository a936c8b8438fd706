//! Agent thoughts table - the append-only thought log

use crate::db::Database;
use chrono::Utc;
use rusqlite::{params, Result as SqliteResult};
use serde::Serialize;

/// A logged thought as stored; tool calls and results stay serialized JSON
#[derive(Debug, Clone, Serialize)]
pub struct AgentThoughtRow {
    pub id: i64,
    pub agent: String,
    pub text: String,
    pub tool_calls: String,
    pub tool_results: String,
    pub created_at: String,
}

impl Database {
    pub fn insert_agent_thought(
        &self,
        agent: &str,
        text: &str,
        tool_calls_json: &str,
        tool_results_json: &str,
    ) -> SqliteResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO agent_thoughts (agent, text, tool_calls, tool_results, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![agent, text, tool_calls_json, tool_results_json, Utc::now().to_rfc3339()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Most recent thoughts first, optionally for one agent
    pub fn list_agent_thoughts(&self, agent: Option<&str>, limit: usize) -> SqliteResult<Vec<AgentThoughtRow>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, agent, text, tool_calls, tool_results, created_at
             FROM agent_thoughts
             WHERE (?1 IS NULL OR agent = ?1)
             ORDER BY id DESC
             LIMIT ?2",
        )?;

        let rows = stmt
            .query_map(params![agent, limit as i64], |row| {
                Ok(AgentThoughtRow {
                    id: row.get(0)?,
                    agent: row.get(1)?,
                    text: row.get(2)?,
                    tool_calls: row.get(3)?,
                    tool_results: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(rows)
    }
}
