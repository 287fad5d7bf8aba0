use crate::judge::JudgePool;
use crate::model::{EvaluationType, JudgeVerdict, RunOutcome, TestCase};
use crate::process_log::ProcessLog;
use crate::prompt::PromptBuilder;
use async_trait::async_trait;
use serde_json::Value;

/// Everything an evaluator may look at for one run.
pub struct RunContext<'a> {
    pub case: &'a TestCase,
    pub run_idx: u32,
    pub capability: &'a str,
    pub indicator: &'a str,
    /// Name of the system under test, as shown to judges.
    pub target_model: &'a str,
    pub judges: &'a JudgePool,
    pub prompts: &'a dyn PromptBuilder,
    pub process_log: &'a dyn ProcessLog,
}

impl RunContext<'_> {
    pub fn case_id(&self) -> &str {
        &self.case.case_id
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunEvaluation {
    pub outcome: Option<RunOutcome>,
    /// Roster-ordered judge opinions; empty for unjudged evaluation.
    pub verdicts: Vec<Option<JudgeVerdict>>,
}

impl RunEvaluation {
    pub fn unjudged(outcome: RunOutcome) -> Self {
        Self {
            outcome: Some(outcome),
            verdicts: Vec::new(),
        }
    }
}

/// One implementation per `EvaluationType`, chosen once per indicator.
///
/// An `Err` marks the run as having no evaluation; it never aborts sibling
/// runs.
#[async_trait]
pub trait Evaluator: Send + Sync {
    fn kind(&self) -> EvaluationType;

    async fn evaluate(&self, ctx: &RunContext<'_>, answer: &Value) -> anyhow::Result<RunEvaluation>;
}
