use std::fmt;
use std::time::Duration;

/// Failure taxonomy of the evaluation pipeline.
///
/// Call sites branch on the variant: a `Timeout` may still carry the last
/// response seen, which an application target can salvage, while an
/// `Application` error is an explicit refusal by the remote service.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EvalError {
    /// Network or HTTP failure. Retried by the retry layer, then surfaced.
    #[error("transient call error: {message}")]
    TransientCall {
        message: String,
        status: Option<u16>,
    },

    /// Remote service answered with a non-zero application code.
    #[error("application error (code {code}): {message}")]
    Application { code: i64, message: String },

    /// Poll loop exceeded its overall deadline.
    #[error("fetching result timed out after {elapsed:?}")]
    Timeout {
        elapsed: Duration,
        last_response: Option<serde_json::Value>,
    },

    /// No judge produced a verdict for this run.
    #[error("[{case_id}] no judge verdict available for run {run}", run = .run_idx + 1)]
    JudgeUnavailable { case_id: String, run_idx: u32 },

    /// Every run of a case failed to produce an evaluation.
    #[error("[{case_id}] all {runs} runs failed")]
    AllRunsFailed { case_id: String, runs: u32 },
}

impl EvalError {
    pub fn transient(message: impl Into<String>) -> Self {
        EvalError::TransientCall {
            message: message.into(),
            status: None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, EvalError::Timeout { .. })
    }

    pub fn is_application(&self) -> bool {
        matches!(self, EvalError::Application { .. })
    }

    /// Last response observed before a timeout, if any.
    pub fn salvage(&self) -> Option<&serde_json::Value> {
        match self {
            EvalError::Timeout { last_response, .. } => last_response.as_ref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for EvalError {
    fn from(e: reqwest::Error) -> Self {
        EvalError::TransientCall {
            message: e.to_string(),
            status: e.status().map(|s| s.as_u16()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(pub String);

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ConfigError {}
