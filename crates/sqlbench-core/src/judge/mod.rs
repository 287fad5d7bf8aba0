pub mod parse;

pub use parse::JudgeOutput;

use crate::engine::retry::{call_with_retry, RetryPolicy};
use crate::process_log::SharedProcessLog;
use crate::providers::llm::LlmClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::timeout;

/// Upper bound on concurrent judge calls per run.
pub const MAX_CONCURRENT_JUDGES: usize = 5;

#[derive(Clone)]
pub struct Judge {
    pub key: String,
    pub client: Arc<dyn LlmClient>,
}

impl Judge {
    pub fn new(key: impl Into<String>, client: Arc<dyn LlmClient>) -> Self {
        Self {
            key: key.into(),
            client,
        }
    }
}

#[derive(Debug, Clone)]
pub struct JudgeReply {
    pub judge: String,
    pub output: JudgeOutput,
}

#[derive(Debug, Clone)]
pub struct JudgePoolSettings {
    pub max_concurrent: usize,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for JudgePoolSettings {
    fn default() -> Self {
        Self {
            max_concurrent: MAX_CONCURRENT_JUDGES,
            timeout: Duration::from_secs(120),
            retry: RetryPolicy::default(),
        }
    }
}

/// Fans one judge prompt out to the whole roster.
#[derive(Clone)]
pub struct JudgePool {
    judges: Vec<Judge>,
    settings: JudgePoolSettings,
    process_log: Option<SharedProcessLog>,
}

impl JudgePool {
    pub fn new(judges: Vec<Judge>, settings: JudgePoolSettings) -> Self {
        Self {
            judges,
            settings,
            process_log: None,
        }
    }

    pub fn with_process_log(mut self, log: SharedProcessLog) -> Self {
        self.process_log = Some(log);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.judges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.judges.len()
    }

    pub fn judge_keys(&self) -> Vec<&str> {
        self.judges.iter().map(|j| j.key.as_str()).collect()
    }

    /// Effective worker count: `min(roster, max_concurrent)`, at least one.
    pub fn pool_size(&self) -> usize {
        self.judges
            .len()
            .min(self.settings.max_concurrent.max(1))
            .max(1)
    }

    /// One slot per judge, in roster order. A judge that errors or exceeds
    /// its timeout leaves `None`. Waits for every judge.
    pub async fn judge_all(&self, prompt: &str, case_id: &str, run_idx: u32) -> Vec<Option<JudgeReply>> {
        if self.judges.is_empty() {
            tracing::warn!(case_id = %case_id, "no judges configured");
            return Vec::new();
        }

        let sem = Arc::new(Semaphore::new(self.pool_size()));
        let prompt: Arc<str> = Arc::from(prompt);
        let mut handles = Vec::with_capacity(self.judges.len());

        for judge in &self.judges {
            let sem = sem.clone();
            let judge = judge.clone();
            let prompt = prompt.clone();
            let settings = self.settings.clone();
            let case_id = case_id.to_string();
            let key = judge.key.clone();
            let h = tokio::spawn(async move {
                let _permit = sem.acquire_owned().await.ok()?;
                let op = format!("judge:{}", judge.key);
                let call = call_with_retry(&settings.retry, &op, || judge.client.complete(&prompt));
                match timeout(settings.timeout, call).await {
                    Ok(Ok(resp)) => Some(JudgeReply {
                        judge: judge.key.clone(),
                        output: JudgeOutput::parse(&resp.text),
                    }),
                    Ok(Err(e)) => {
                        tracing::error!(case_id = %case_id, run_idx, judge = %judge.key, error = %e, "judge failed");
                        None
                    }
                    Err(_) => {
                        tracing::error!(case_id = %case_id, run_idx, judge = %judge.key, timeout_s = settings.timeout.as_secs(), "judge timed out");
                        None
                    }
                }
            });
            handles.push((key, h));
        }

        let mut replies = Vec::with_capacity(handles.len());
        for (key, h) in handles {
            let reply = match h.await {
                Ok(r) => r,
                Err(e) => {
                    tracing::error!(case_id = %case_id, judge = %key, error = %e, "judge task join error");
                    None
                }
            };
            if let Some(log) = &self.process_log {
                match &reply {
                    Some(r) => log.record(&format!(
                        "[{}] Run {} Judge {} result: {}",
                        case_id,
                        run_idx + 1,
                        key,
                        r.output.parsed
                    )),
                    None => log.record(&format!(
                        "[{}] Run {} Judge {} failed",
                        case_id,
                        run_idx + 1,
                        key
                    )),
                }
            }
            replies.push(reply);
        }
        replies
    }
}
