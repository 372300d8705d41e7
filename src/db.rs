use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::models::AppliedJob;

/// Durable record of every job processed, across runs. Seeded into the
/// run's visited set at startup so a job is never applied to twice, even
/// after a restart.
pub struct History {
    conn: Connection,
    path: PathBuf,
}

impl History {
    pub fn open() -> Result<Self> {
        Self::open_at(&Self::default_path())
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open history db at {}", path.display()))?;
        let history = Self {
            conn,
            path: path.to_path_buf(),
        };
        history.init()?;
        Ok(history)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn default_path() -> PathBuf {
        // XDG data directory, falling back to the working directory.
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "autoapply") {
            proj_dirs.data_dir().join("applied.db")
        } else {
            PathBuf::from("applied.db")
        }
    }

    fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS applied_jobs (
                job_id TEXT PRIMARY KEY,
                title TEXT,
                company TEXT,
                submitted INTEGER NOT NULL DEFAULT 0,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )?;
        Ok(())
    }

    pub fn applied_ids(&self) -> Result<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT job_id FROM applied_jobs")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        rows.collect::<Result<HashSet<_>, _>>()
            .context("Failed to load applied job ids")
    }

    /// First write wins: re-recording a job id is a no-op.
    pub fn record(
        &self,
        job_id: &str,
        title: Option<&str>,
        company: Option<&str>,
        submitted: bool,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO applied_jobs (job_id, title, company, submitted)
             VALUES (?1, ?2, ?3, ?4)",
            params![job_id, title, company, submitted],
        )?;
        Ok(())
    }

    pub fn recent(&self, limit: usize) -> Result<Vec<AppliedJob>> {
        let mut stmt = self.conn.prepare(
            "SELECT job_id, title, company, submitted, applied_at
             FROM applied_jobs ORDER BY applied_at DESC, job_id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map([limit as i64], Self::row_to_applied)?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list applied jobs")
    }

    fn row_to_applied(row: &rusqlite::Row) -> rusqlite::Result<AppliedJob> {
        Ok(AppliedJob {
            job_id: row.get(0)?,
            title: row.get(1)?,
            company: row.get(2)?,
            submitted: row.get(3)?,
            applied_at: row.get(4)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (tempfile::TempDir, History) {
        let dir = tempfile::tempdir().unwrap();
        let history = History::open_at(&dir.path().join("applied.db")).unwrap();
        (dir, history)
    }

    #[test]
    fn records_are_durable_and_deduplicated() {
        let (_dir, history) = open_temp();
        history
            .record("101", Some("Engineer"), Some("Initech"), true)
            .unwrap();
        history.record("101", Some("Engineer (dup)"), None, false).unwrap();
        history.record("202", None, None, false).unwrap();

        let ids = history.applied_ids().unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("101"));

        let rows = history.recent(10).unwrap();
        assert_eq!(rows.len(), 2);
        let first = rows.iter().find(|r| r.job_id == "101").unwrap();
        assert_eq!(first.title.as_deref(), Some("Engineer"));
        assert!(first.submitted);
    }

    #[test]
    fn reopening_preserves_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("applied.db");
        {
            let history = History::open_at(&path).unwrap();
            history.record("303", Some("Analyst"), Some("Globex"), false).unwrap();
        }
        let history = History::open_at(&path).unwrap();
        assert!(history.applied_ids().unwrap().contains("303"));
    }
}
