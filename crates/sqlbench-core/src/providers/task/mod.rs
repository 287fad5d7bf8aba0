//! Submit-then-poll protocol for task-based services.
//!
//! A task is submitted with one form POST that must answer
//! `{"code": 0, "data": {"task_id": ...}}`. The poller then fetches the
//! status URL until the caller's status function reports completion, the
//! task fails, or the overall deadline passes.

pub mod app;

use crate::errors::EvalError;
use serde_json::Value;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Running,
    Complete,
    Failed,
}

impl TaskStatus {
    /// `running` and `complete` map to themselves; anything else is terminal.
    pub fn parse(s: &str) -> Self {
        match s {
            "running" => TaskStatus::Running,
            "complete" => TaskStatus::Complete,
            _ => TaskStatus::Failed,
        }
    }
}

/// Floor on the sleep between status fetches.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_wait: Duration,
    /// Bound on a single HTTP exchange.
    pub fetch_timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            max_wait: Duration::from_secs(20 * 60),
            fetch_timeout: Duration::from_secs(300),
        }
    }
}

#[derive(Clone)]
pub struct TaskPoller {
    client: reqwest::Client,
    api_key: Option<String>,
    pub settings: PollSettings,
}

impl TaskPoller {
    pub fn new(client: reqwest::Client, api_key: Option<String>, settings: PollSettings) -> Self {
        Self {
            client,
            api_key,
            settings,
        }
    }

    /// Submits a form-encoded task and returns its id.
    ///
    /// A non-zero `code` in the reply is an `Application` error.
    pub async fn submit(&self, url: &str, form: &[(&str, String)]) -> Result<String, EvalError> {
        tracing::info!(event = "task_submit", url = %url);
        let mut req = self.client.post(url).form(form);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = timeout(self.settings.fetch_timeout, req.send())
            .await
            .map_err(|_| EvalError::transient(format!("task submission to {} timed out", url)))??
            .error_for_status()?;
        let body: Value = resp.json().await?;

        let code = body.get("code").and_then(Value::as_i64);
        if code != Some(0) {
            return Err(EvalError::Application {
                code: code.unwrap_or(-1),
                message: message_of(&body, "Unknown error"),
            });
        }

        match body.pointer("/data/task_id") {
            Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            _ => Err(EvalError::Application {
                code: -1,
                message: "submission reply carries no task_id".into(),
            }),
        }
    }

    /// Single status fetch.
    pub async fn fetch(&self, url: &str) -> Result<Value, EvalError> {
        let mut req = self.client.get(url);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await?.error_for_status()?;
        Ok(resp.json().await?)
    }

    /// Polls until complete, failed, or `max_wait` has elapsed.
    ///
    /// The deadline is checked before every fetch and bounds both the fetch
    /// and the sleep, so a hung service cannot hold the caller past it.
    /// `Timeout` carries the last response seen.
    pub async fn poll<U, S, X>(
        &self,
        task_id: &str,
        url_for: U,
        status_of: S,
        extract: X,
    ) -> Result<Value, EvalError>
    where
        U: Fn(&str) -> String,
        S: Fn(&Value) -> TaskStatus,
        X: Fn(&Value) -> Value,
    {
        let PollSettings {
            interval,
            max_wait,
            fetch_timeout,
        } = self.settings;
        let interval = interval.max(MIN_POLL_INTERVAL);
        let start = Instant::now();
        let deadline = start + max_wait;
        let url = url_for(task_id);
        let mut last_response: Option<Value> = None;
        let mut fetches = 0u32;

        loop {
            let now = Instant::now();
            if now >= deadline {
                tracing::warn!(event = "task_timeout", task_id = %task_id, fetches, "poll deadline reached");
                return Err(EvalError::Timeout {
                    elapsed: now - start,
                    last_response,
                });
            }

            fetches += 1;
            let budget = fetch_timeout.min(deadline - now);
            let body = match timeout(budget, self.fetch(&url)).await {
                Ok(res) => res?,
                Err(_) if Instant::now() >= deadline => continue,
                Err(_) => {
                    return Err(EvalError::transient(format!(
                        "status fetch for task {} timed out",
                        task_id
                    )))
                }
            };

            match status_of(&body) {
                TaskStatus::Running => {
                    tracing::debug!(task_id = %task_id, fetches, "task still running");
                    last_response = Some(body);
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    sleep(interval.min(remaining)).await;
                }
                TaskStatus::Complete => {
                    tracing::info!(event = "task_complete", task_id = %task_id, fetches);
                    return Ok(extract(&body));
                }
                TaskStatus::Failed => {
                    tracing::error!(event = "task_failed", task_id = %task_id, response = %body);
                    return Err(EvalError::Application {
                        code: body.get("code").and_then(Value::as_i64).unwrap_or(-1),
                        message: message_of(&body, "Task failed"),
                    });
                }
            }
        }
    }
}

fn message_of(body: &Value, default: &str) -> String {
    body.get("message")
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}
