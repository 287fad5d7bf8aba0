use async_trait::async_trait;
use serde_json::Value;
use sqlbench_core::consensus::majority_bool;
use sqlbench_core::errors::EvalError;
use sqlbench_core::evaluator::{Evaluator, RunContext, RunEvaluation};
use sqlbench_core::model::{EvaluationType, JudgeVerdict, RunOutcome, VerdictValue};

/// Judges answer yes/no; the run passes on a simple majority of the
/// judges that replied.
pub struct HybridEvaluator;

#[async_trait]
impl Evaluator for HybridEvaluator {
    fn kind(&self) -> EvaluationType {
        EvaluationType::Hybrid
    }

    async fn evaluate(&self, ctx: &RunContext<'_>, answer: &Value) -> anyhow::Result<RunEvaluation> {
        let prompt = ctx.prompts.judge_prompt(
            ctx.target_model,
            ctx.capability,
            ctx.indicator,
            ctx.case,
            answer,
        )?;
        ctx.process_log.record(&format!(
            "[{}] Run {} judge prompt: {}",
            ctx.case_id(),
            ctx.run_idx + 1,
            prompt
        ));

        let replies = ctx.judges.judge_all(&prompt, ctx.case_id(), ctx.run_idx).await;
        let verdicts: Vec<Option<JudgeVerdict>> = replies
            .into_iter()
            .map(|r| {
                r.map(|r| JudgeVerdict {
                    value: VerdictValue::Bool(r.output.yes_no()),
                    judge: r.judge,
                })
            })
            .collect();

        let votes: Vec<bool> = verdicts
            .iter()
            .flatten()
            .filter_map(|v| match v.value {
                VerdictValue::Bool(b) => Some(b),
                VerdictValue::Rules(_) => None,
            })
            .collect();

        let Some(passed) = majority_bool(&votes) else {
            return Err(EvalError::JudgeUnavailable {
                case_id: ctx.case_id().to_string(),
                run_idx: ctx.run_idx,
            }
            .into());
        };
        tracing::debug!(case_id = %ctx.case_id(), run_idx = ctx.run_idx, yes = votes.iter().filter(|b| **b).count(), total = votes.len(), "hybrid votes");

        Ok(RunEvaluation {
            outcome: Some(RunOutcome::Bool(passed)),
            verdicts,
        })
    }
}
