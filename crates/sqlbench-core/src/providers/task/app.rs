use super::{TaskPoller, TaskStatus};
use crate::errors::EvalError;
use crate::model::TestCase;
use crate::providers::parse_lenient;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationKind {
    /// SQL rewrite service.
    Optimize,
    /// Dialect conversion service.
    Convert,
}

impl ApplicationKind {
    pub fn default_submit_path(&self) -> &'static str {
        match self {
            ApplicationKind::Optimize => "/api/v1/third-party/optimizes/rewrite",
            ApplicationKind::Convert => "/api/v1/convert",
        }
    }

    pub fn default_result_path(&self) -> &'static str {
        match self {
            ApplicationKind::Optimize => "/api/v1/third-party/optimizes/sql",
            ApplicationKind::Convert => "/api/v1/gettask",
        }
    }
}

/// Task-based application endpoint: builds the submission for a case and
/// interprets status replies for its kind.
#[derive(Clone)]
pub struct ApplicationClient {
    pub kind: ApplicationKind,
    pub base_url: String,
    pub submit_path: String,
    pub result_path: String,
    pub skip_index_advice: bool,
    pub poller: TaskPoller,
}

impl ApplicationClient {
    pub fn new(kind: ApplicationKind, base_url: impl Into<String>, poller: TaskPoller) -> Self {
        Self {
            kind,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            submit_path: kind.default_submit_path().to_string(),
            result_path: kind.default_result_path().to_string(),
            skip_index_advice: true,
            poller,
        }
    }

    fn submission(&self, case: &TestCase) -> Result<Vec<(&'static str, String)>, EvalError> {
        let field = |k: &str| case.get_str(k).unwrap_or_default().to_string();
        let sql = field("sql");
        if sql.trim().is_empty() {
            return Err(EvalError::Application {
                code: 400,
                message: "SQL statement is required".into(),
            });
        }
        Ok(match self.kind {
            ApplicationKind::Optimize => vec![
                ("type", "SQL".to_string()),
                ("content", sql),
                ("metadata", field("create_table_statements")),
                ("explain", field("explain")),
            ],
            ApplicationKind::Convert => vec![
                ("sql", sql),
                ("source_db", field("source_dialect")),
                ("target_db", field("target_dialect")),
            ],
        })
    }

    fn status_of(&self, resp: &Value) -> TaskStatus {
        match self.kind {
            ApplicationKind::Optimize => {
                let state = |p: &str| resp.pointer(p).and_then(Value::as_str);
                let optimize = state("/data/optimize/state");
                if optimize == Some("failed") {
                    return TaskStatus::Failed;
                }
                let index_ready =
                    self.skip_index_advice || state("/data/advised_index/state") == Some("done");
                if optimize == Some("done") && index_ready {
                    TaskStatus::Complete
                } else {
                    TaskStatus::Running
                }
            }
            ApplicationKind::Convert => TaskStatus::parse(
                resp.pointer("/data/progress_status")
                    .and_then(Value::as_str)
                    .unwrap_or("failed"),
            ),
        }
    }

    fn extract(&self, resp: &Value) -> Value {
        match self.kind {
            ApplicationKind::Optimize => Value::String(optimized_sql(resp)),
            ApplicationKind::Convert => match resp.pointer("/data/target_sql") {
                Some(Value::String(s)) => parse_lenient(s.trim()),
                Some(other) if !other.is_null() => other.clone(),
                _ => Value::String(String::new()),
            },
        }
    }

    /// Submits the case and waits for the result.
    ///
    /// On timeout the last running response is salvaged through the kind's
    /// extractor when it yields a non-empty answer.
    pub async fn request(&self, case: &TestCase) -> Result<Value, EvalError> {
        let form = self.submission(case)?;
        let submit_url = format!("{}{}", self.base_url, self.submit_path);
        let task_id = self.poller.submit(&submit_url, &form).await?;

        let result_base = format!("{}{}", self.base_url, self.result_path);
        let polled = self
            .poller
            .poll(
                &task_id,
                |tid| format!("{}/{}", result_base, tid),
                |resp| self.status_of(resp),
                |resp| self.extract(resp),
            )
            .await;

        match polled {
            Err(e) if e.is_timeout() => {
                let salvaged = e.salvage().map(|last| self.extract(last));
                match salvaged {
                    Some(v) if !is_blank(&v) => {
                        tracing::warn!(
                            case_id = %case.case_id,
                            task_id = %task_id,
                            "task timed out, using last known result"
                        );
                        Ok(v)
                    }
                    _ => Err(e),
                }
            }
            other => other,
        }
    }
}

/// Last rewrite step's SQL, falling back to the original statement.
fn optimized_sql(resp: &Value) -> String {
    let origin = resp
        .pointer("/data/origin_sql")
        .and_then(Value::as_str)
        .unwrap_or_default();
    resp.pointer("/data/optimize/steps")
        .and_then(Value::as_array)
        .and_then(|steps| steps.last())
        .and_then(|step| step.get("optimized_sql"))
        .and_then(Value::as_str)
        .unwrap_or(origin)
        .to_string()
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(kind: ApplicationKind) -> ApplicationClient {
        ApplicationClient::new(
            kind,
            "http://localhost",
            TaskPoller::new(reqwest::Client::new(), None, Default::default()),
        )
    }

    #[test]
    fn optimize_status_honours_index_advice_flag() {
        let resp = json!({"data": {"optimize": {"state": "done"}, "advised_index": {"state": "running"}}});
        let mut c = client(ApplicationKind::Optimize);
        assert_eq!(c.status_of(&resp), TaskStatus::Complete);
        c.skip_index_advice = false;
        assert_eq!(c.status_of(&resp), TaskStatus::Running);

        let failed = json!({"data": {"optimize": {"state": "failed"}}});
        assert_eq!(c.status_of(&failed), TaskStatus::Failed);
    }

    #[test]
    fn optimized_sql_falls_back_to_origin() {
        let with_steps = json!({"data": {
            "origin_sql": "select * from t",
            "optimize": {"steps": [{"optimized_sql": "a"}, {"optimized_sql": "select id from t"}]}
        }});
        assert_eq!(optimized_sql(&with_steps), "select id from t");

        let no_steps = json!({"data": {"origin_sql": "select * from t", "optimize": {"steps": []}}});
        assert_eq!(optimized_sql(&no_steps), "select * from t");
    }

    #[test]
    fn convert_reads_progress_status_and_target_sql() {
        let c = client(ApplicationKind::Convert);
        let running = json!({"data": {"progress_status": "running"}});
        assert_eq!(c.status_of(&running), TaskStatus::Running);
        assert_eq!(c.status_of(&json!({"data": {}})), TaskStatus::Failed);

        let done = json!({"data": {"progress_status": "complete", "target_sql": "```sql\nSELECT 1\n```"}});
        assert_eq!(c.extract(&done), json!("SELECT 1"));
    }

    #[test]
    fn missing_sql_is_rejected_before_submit() {
        let c = client(ApplicationKind::Optimize);
        let case = TestCase::new("c1", serde_json::Map::new());
        assert!(c.submission(&case).unwrap_err().is_application());
    }
}
