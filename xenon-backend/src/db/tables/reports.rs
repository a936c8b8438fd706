//! Reports table - synthesized execution reports

use crate::db::Database;
use crate::memory::StoredReport;
use chrono::Utc;
use rusqlite::{params_from_iter, params, Result as SqliteResult, Row};

fn report_from_row(row: &Row) -> SqliteResult<StoredReport> {
    Ok(StoredReport {
        id: row.get(0)?,
        content: row.get(1)?,
        created_at: row.get(2)?,
    })
}

impl Database {
    pub fn insert_report(&self, content: &str) -> SqliteResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO reports (content, created_at) VALUES (?1, ?2)",
            params![content, Utc::now().to_rfc3339()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn recent_reports(&self, limit: usize) -> SqliteResult<Vec<StoredReport>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, content, created_at FROM reports ORDER BY id DESC LIMIT ?1",
        )?;
        let reports = stmt
            .query_map(params![limit as i64], report_from_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(reports)
    }

    /// Reports containing any of the keywords (case-insensitive), newest first
    pub fn search_reports(&self, keywords: &[String], limit: usize) -> SqliteResult<Vec<StoredReport>> {
        if keywords.is_empty() {
            return Ok(Vec::new());
        }

        let filter = vec!["lower(content) LIKE ?"; keywords.len()].join(" OR ");
        let sql = format!(
            "SELECT id, content, created_at FROM reports WHERE {} ORDER BY id DESC LIMIT {}",
            filter, limit
        );

        let patterns: Vec<String> = keywords
            .iter()
            .map(|k| format!("%{}%", k.to_lowercase()))
            .collect();

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let reports = stmt
            .query_map(params_from_iter(patterns.iter()), report_from_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(reports)
    }
}
