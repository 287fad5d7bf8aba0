use super::target::Target;
use crate::consensus::reduce_runs;
use crate::errors::EvalError;
use crate::evaluator::{Evaluator, RunContext};
use crate::judge::JudgePool;
use crate::model::{CaseResult, RunAttempt, RunOutcome, TestCase};
use crate::process_log::SharedProcessLog;
use crate::prompt::PromptBuilder;
use std::sync::Arc;
use std::time::Instant;

/// Runs one case `runs` times and reduces the outcomes.
#[derive(Clone)]
pub struct CaseWorker {
    pub target: Arc<dyn Target>,
    pub evaluator: Arc<dyn Evaluator>,
    pub judges: JudgePool,
    pub prompts: Arc<dyn PromptBuilder>,
    pub process_log: SharedProcessLog,
    pub capability: String,
    pub indicator: String,
    pub runs: u32,
}

impl CaseWorker {
    pub async fn process_case(&self, case: &TestCase, case_index: usize) -> CaseResult {
        let started = Instant::now();
        let case_id = case.case_id.as_str();
        let runs = self.runs.max(1);
        tracing::info!(case_id = %case_id, case_index, runs, "processing case");

        let prompt = self
            .prompts
            .target_prompt(&self.capability, &self.indicator, case);

        let mut attempts = Vec::with_capacity(runs as usize);
        for run_idx in 0..runs {
            self.log(format!("[{}] Run {}/{}", case_id, run_idx + 1, runs));
            let run_started = Instant::now();

            let prompt = match &prompt {
                Ok(p) => p.as_str(),
                Err(e) => {
                    let msg = format!("prompt construction failed: {:#}", e);
                    self.log(format!("[{}] Run {} answer: ERROR: {}", case_id, run_idx + 1, msg));
                    attempts.push(RunAttempt::failed(run_idx, msg));
                    continue;
                }
            };
            if run_idx == 0 {
                self.log(format!("[{}] prompt: {}", case_id, prompt));
            }

            let mut attempt = match self.target.answer(case, prompt, run_idx).await {
                Ok(answer) => {
                    self.log(format!("[{}] Run {} answer: {}", case_id, run_idx + 1, answer));
                    RunAttempt::answered(run_idx, answer)
                }
                Err(e) => {
                    tracing::error!(case_id = %case_id, run_idx, error = %e, "target call failed");
                    self.log(format!("[{}] Run {} answer: ERROR: {}", case_id, run_idx + 1, e));
                    attempts.push(with_duration(RunAttempt::failed(run_idx, &e), run_started));
                    continue;
                }
            };

            let ctx = RunContext {
                case,
                run_idx,
                capability: &self.capability,
                indicator: &self.indicator,
                target_model: self.target.name(),
                judges: &self.judges,
                prompts: self.prompts.as_ref(),
                process_log: self.process_log.as_ref(),
            };
            match self.evaluator.evaluate(&ctx, &attempt.model_answer).await {
                Ok(eval) => {
                    attempt.outcome = eval.outcome;
                    attempt.judges = eval.verdicts;
                }
                Err(e) => {
                    tracing::warn!(case_id = %case_id, run_idx, error = %e, "run evaluation unavailable");
                }
            }
            self.log(format!(
                "[{}] Run {} result: {}",
                case_id,
                run_idx + 1,
                describe(attempt.outcome.as_ref())
            ));
            attempts.push(with_duration(attempt, run_started));
        }

        let outcomes: Vec<RunOutcome> = attempts.iter().filter_map(|a| a.outcome.clone()).collect();
        let duration_ms = Some(started.elapsed().as_millis() as u64);

        if outcomes.is_empty() {
            let err = EvalError::AllRunsFailed {
                case_id: case_id.to_string(),
                runs,
            };
            tracing::error!(case_id = %case_id, "all runs failed");
            self.log(format!("[{}] final: FAILED ({})", case_id, err));
            let mut r = CaseResult::failed(case_id, case_index, attempts, err.to_string());
            r.duration_ms = duration_ms;
            return r;
        }

        match reduce_runs(self.evaluator.kind(), case_id, &outcomes) {
            Ok(verdict) => {
                tracing::info!(case_id = %case_id, verdict = %verdict, "case reduced");
                self.log(format!("[{}] final: {}", case_id, verdict));
                CaseResult {
                    case_id: case_id.to_string(),
                    case_index,
                    success: true,
                    attempts,
                    final_result: Some(verdict),
                    error: None,
                    duration_ms,
                }
            }
            Err(e) => {
                self.log(format!("[{}] final: FAILED ({})", case_id, e));
                let mut r = CaseResult::failed(case_id, case_index, attempts, e.to_string());
                r.duration_ms = duration_ms;
                r
            }
        }
    }

    fn log(&self, line: String) {
        self.process_log.record(&line);
    }
}

fn with_duration(mut a: RunAttempt, started: Instant) -> RunAttempt {
    a.duration_ms = Some(started.elapsed().as_millis() as u64);
    a
}

fn describe(outcome: Option<&RunOutcome>) -> String {
    match outcome {
        None => "no evaluation".into(),
        Some(RunOutcome::Bool(b)) => b.to_string(),
        Some(RunOutcome::JudgeRules(sets)) => {
            let per_judge: Vec<String> = sets
                .iter()
                .map(|s| {
                    let ids: Vec<&str> = s.iter().map(|id| id.as_str()).collect();
                    format!("[{}]", ids.join(", "))
                })
                .collect();
            format!("[{}]", per_judge.join(", "))
        }
    }
}
