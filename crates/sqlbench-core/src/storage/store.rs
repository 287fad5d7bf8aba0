use crate::model::{CaseResult, EvaluationType, FinalVerdict, RunAttempt};
use anyhow::Context;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredCase {
    pub indicator: String,
    pub case_id: String,
    pub case_index: usize,
    pub status: String,
    pub success: bool,
    pub final_result: Option<FinalVerdict>,
    pub error: Option<String>,
    pub attempts: Vec<RunAttempt>,
    pub prompt_fingerprint: Option<String>,
}

pub struct StoreStats {
    pub runs: u64,
    pub case_results: u64,
    pub last_run_id: Option<i64>,
    pub last_status: Option<String>,
}

/// Identifies the indicator a result belongs to.
pub struct IndicatorKey<'a> {
    pub label: &'a str,
    pub evaluation_type: EvaluationType,
}

impl Store {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path).context("failed to open sqlite db")?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory sqlite db")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("sqlite connection lock poisoned"))
    }

    pub fn init_schema(&self) -> anyhow::Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(crate::storage::schema::DDL)?;
        Ok(())
    }

    pub fn create_run(&self, suite: &str, target: &str, config_json: &str) -> anyhow::Result<i64> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO runs(suite, target, started_at, status, config_json) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![suite, target, now_rfc3339(), "running", config_json],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn finalize_run(&self, run_id: i64, status: &str) -> anyhow::Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE runs SET status=?1, finished_at=?2 WHERE id=?3",
            params![status, now_rfc3339(), run_id],
        )?;
        Ok(())
    }

    pub fn insert_case_result(
        &self,
        run_id: i64,
        indicator: &IndicatorKey<'_>,
        result: &CaseResult,
        prompt_fingerprint: Option<&str>,
    ) -> anyhow::Result<()> {
        let final_json = result
            .final_result
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO case_results(run_id, indicator, evaluation_type, case_id, case_index, status, success,
                                      final_json, error, duration_ms, attempts_json, prompt_fingerprint)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                run_id,
                indicator.label,
                indicator.evaluation_type.as_str(),
                result.case_id,
                result.case_index as i64,
                result.status().as_str(),
                result.success,
                final_json,
                result.error,
                result.duration_ms.map(|v| v as i64),
                serde_json::to_string(&result.attempts)?,
                prompt_fingerprint,
            ],
        )?;
        Ok(())
    }

    /// Stored results of a run, in indicator then case order.
    pub fn fetch_case_results(&self, run_id: i64) -> anyhow::Result<Vec<StoredCase>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT indicator, case_id, case_index, status, success, final_json, error, attempts_json, prompt_fingerprint
             FROM case_results WHERE run_id = ?1 ORDER BY id ASC",
        )?;
        let mut rows = stmt.query(params![run_id])?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let final_json: Option<String> = row.get(5)?;
            let attempts_json: String = row.get(7)?;
            out.push(StoredCase {
                indicator: row.get(0)?,
                case_id: row.get(1)?,
                case_index: row.get::<_, i64>(2)? as usize,
                status: row.get(3)?,
                success: row.get(4)?,
                final_result: final_json.as_deref().map(serde_json::from_str).transpose()?,
                error: row.get(6)?,
                attempts: serde_json::from_str(&attempts_json)?,
                prompt_fingerprint: row.get(8)?,
            });
        }
        Ok(out)
    }

    pub fn run_status(&self, run_id: i64) -> anyhow::Result<Option<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT status FROM runs WHERE id = ?1")?;
        let mut rows = stmt.query(params![run_id])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    pub fn stats(&self) -> anyhow::Result<StoreStats> {
        let conn = self.lock()?;
        let runs: i64 = conn.query_row("SELECT COUNT(*) FROM runs", [], |r| r.get(0))?;
        let case_results: i64 = conn.query_row("SELECT COUNT(*) FROM case_results", [], |r| r.get(0))?;
        let mut stmt = conn.prepare("SELECT id, status FROM runs ORDER BY id DESC LIMIT 1")?;
        let mut rows = stmt.query([])?;
        let (last_run_id, last_status) = match rows.next()? {
            Some(row) => (Some(row.get(0)?), Some(row.get(1)?)),
            None => (None, None),
        };
        Ok(StoreStats {
            runs: runs as u64,
            case_results: case_results as u64,
            last_run_id,
            last_status,
        })
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
