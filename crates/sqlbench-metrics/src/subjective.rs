use async_trait::async_trait;
use serde_json::Value;
use sqlbench_core::errors::EvalError;
use sqlbench_core::evaluator::{Evaluator, RunContext, RunEvaluation};
use sqlbench_core::model::{EvaluationType, JudgeVerdict, RuleSet, RunOutcome, VerdictValue};

/// Each judge names the rule ids the answer applied. The per-judge sets
/// are kept as they are; reduction happens once all runs are in.
pub struct SubjectiveEvaluator;

#[async_trait]
impl Evaluator for SubjectiveEvaluator {
    fn kind(&self) -> EvaluationType {
        EvaluationType::Subjective
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
                    value: VerdictValue::Rules(r.output.matched_rules()),
                    judge: r.judge,
                })
            })
            .collect();

        let sets: Vec<RuleSet> = verdicts
            .iter()
            .flatten()
            .filter_map(|v| match &v.value {
                VerdictValue::Rules(set) => Some(set.clone()),
                VerdictValue::Bool(_) => None,
            })
            .collect();
        if sets.is_empty() {
            return Err(EvalError::JudgeUnavailable {
                case_id: ctx.case_id().to_string(),
                run_idx: ctx.run_idx,
            }
            .into());
        }

        Ok(RunEvaluation {
            outcome: Some(RunOutcome::JudgeRules(sets)),
            verdicts,
        })
    }
}
