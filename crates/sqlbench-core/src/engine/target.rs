use super::retry::{call_with_retry, call_with_retry_if, RetryPolicy};
use crate::errors::EvalError;
use crate::model::TestCase;
use crate::providers::llm::LlmClient;
use crate::providers::parse_lenient;
use crate::providers::task::app::ApplicationClient;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// The system under test.
#[async_trait]
pub trait Target: Send + Sync {
    fn name(&self) -> &str;

    async fn answer(&self, case: &TestCase, prompt: &str, run_idx: u32) -> Result<Value, EvalError>;
}

/// Prompt-driven model target.
pub struct LlmTarget {
    client: Arc<dyn LlmClient>,
    retry: RetryPolicy,
}

impl LlmTarget {
    pub fn new(client: Arc<dyn LlmClient>, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }
}

fn into_eval_error(e: anyhow::Error) -> EvalError {
    match e.downcast::<EvalError>() {
        Ok(eval) => eval,
        Err(other) => EvalError::transient(format!("{:#}", other)),
    }
}

#[async_trait]
impl Target for LlmTarget {
    fn name(&self) -> &str {
        self.client.model()
    }

    async fn answer(&self, case: &TestCase, prompt: &str, run_idx: u32) -> Result<Value, EvalError> {
        let op = format!("target:{}:{}", case.case_id, run_idx + 1);
        let resp = call_with_retry(&self.retry, &op, || self.client.complete(prompt))
            .await
            .map_err(into_eval_error)?;
        Ok(parse_lenient(&resp.text))
    }
}

/// Task-based application target. The prompt is unused; the case fields
/// form the submission.
pub struct ApplicationTarget {
    client: ApplicationClient,
    retry: RetryPolicy,
    name: String,
}

impl ApplicationTarget {
    pub fn new(client: ApplicationClient, retry: RetryPolicy, name: impl Into<String>) -> Self {
        Self {
            client,
            retry,
            name: name.into(),
        }
    }
}

#[async_trait]
impl Target for ApplicationTarget {
    fn name(&self) -> &str {
        &self.name
    }

    async fn answer(&self, case: &TestCase, _prompt: &str, run_idx: u32) -> Result<Value, EvalError> {
        let op = format!("application:{}:{}", case.case_id, run_idx + 1);
        // A poll timeout has already spent the whole wait budget.
        call_with_retry_if(&self.retry, &op, |e: &EvalError| !e.is_timeout(), || {
            self.client.request(case)
        })
        .await
    }
}
