//! Append-only SQLite audit trail for every command the executor runs.
//!
//! A write failure here must never interrupt command execution: it is logged
//! and swallowed, the same way the caller's result is returned regardless.

use pgagent_core::AuditRecord;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub struct AuditStore {
    path: PathBuf,
    conn: Mutex<Connection>,
}

impl AuditStore {
    /// Opens (creating if needed) the database at `path` and ensures the
    /// `audit_logs` table exists.
    pub fn open(path: impl AsRef<Path>) -> rusqlite::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        let conn = Connection::open(&path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS audit_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT,
                command TEXT,
                executed_command TEXT,
                exit_code INTEGER,
                stdout TEXT,
                stderr TEXT
            )",
            [],
        )?;

        Ok(Self { path, conn: Mutex::new(conn) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records one execution. Failures are logged at `error` level and
    /// swallowed — the caller always gets its own command result regardless
    /// of whether the audit write succeeded.
    pub fn log(&self, command: &str, executed_command: &str, exit_code: i32, stdout: &str, stderr: &str) {
        let timestamp = chrono::Utc::now().to_rfc3339();
        let result = self.conn.lock().unwrap().execute(
            "INSERT INTO audit_logs (timestamp, command, executed_command, exit_code, stdout, stderr)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![timestamp, command, executed_command, exit_code, stdout, stderr],
        );

        if let Err(e) = result {
            tracing::error!("CRITICAL: failed to write audit log: {e}");
        }
    }

    /// Returns up to `limit` most recent records, newest first. An empty
    /// vector on any read failure rather than propagating the error.
    pub fn last(&self, limit: u32) -> Vec<AuditRecord> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = match conn.prepare(
            "SELECT id, timestamp, command, executed_command, exit_code, stdout, stderr
             FROM audit_logs ORDER BY id DESC LIMIT ?1",
        ) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("failed to prepare audit query: {e}");
                return Vec::new();
            }
        };

        let rows = stmt.query_map([limit], |row| {
            Ok(AuditRecord {
                id: row.get(0)?,
                timestamp: row.get(1)?,
                command: row.get(2)?,
                executed_command: row.get(3)?,
                exit_code: row.get(4)?,
                stdout: row.get(5)?,
                stderr: row.get(6)?,
            })
        });

        match rows {
            Ok(iter) => iter.filter_map(|r| r.ok()).collect(),
            Err(e) => {
                tracing::error!("failed to read audit log: {e}");
                Vec::new()
            }
        }
    }
}
