use async_trait::async_trait;
use serde_json::{json, Value};
use sqlbench_core::engine::{CaseWorker, RetryPolicy, Target};
use sqlbench_core::errors::EvalError;
use sqlbench_core::judge::{Judge, JudgePool, JudgePoolSettings};
use sqlbench_core::model::{rule_set, CaseStatus, EvaluationType, FinalVerdict, RuleSet, RunOutcome, TestCase, VerdictValue};
use sqlbench_core::process_log::{MemoryProcessLog, ProcessLog};
use sqlbench_core::prompt::TemplatePromptBuilder;
use sqlbench_core::providers::llm::fake::FakeClient;
use sqlbench_metrics::evaluator_for;
use std::sync::Arc;
use std::time::Duration;

struct Fixed(Value);

#[async_trait]
impl Target for Fixed {
    fn name(&self) -> &str {
        "fixed-model"
    }

    async fn answer(&self, _case: &TestCase, _prompt: &str, _run_idx: u32) -> Result<Value, EvalError> {
        Ok(self.0.clone())
    }
}

fn pool(judges: Vec<Judge>) -> JudgePool {
    JudgePool::new(
        judges,
        JudgePoolSettings {
            max_concurrent: 5,
            timeout: Duration::from_millis(500),
            retry: RetryPolicy::once(),
        },
    )
}

fn judge(key: &str, reply: &str) -> Judge {
    Judge::new(key, Arc::new(FakeClient::replying(key, [reply])))
}

fn worker(kind: EvaluationType, answer: Value, judges: Vec<Judge>, log: Arc<MemoryProcessLog>) -> CaseWorker {
    CaseWorker {
        target: Arc::new(Fixed(answer)),
        evaluator: evaluator_for(kind),
        judges: pool(judges).with_process_log(log.clone()),
        prompts: Arc::new(TemplatePromptBuilder::new(
            "{{sql}}",
            Some("Did {{model}} answer {{sql}} with {{answer}}?".into()),
        )),
        process_log: log,
        capability: "sql_optimization".into(),
        indicator: "rewrite".into(),
        runs: 3,
    }
}

fn case(fields: Value) -> TestCase {
    serde_json::from_value(fields).unwrap()
}

#[tokio::test]
async fn objective_compares_against_expected() {
    let log = MemoryProcessLog::shared();
    let w = worker(EvaluationType::Objective, json!(" 1E2 "), vec![], log);
    let r = w
        .process_case(&case(json!({"case_id": "o1", "sql": "q", "expected": "100.00"})), 0)
        .await;
    assert_eq!(r.final_result, Some(FinalVerdict::Bool(true)));
}

#[tokio::test]
async fn objective_without_expected_answer_is_an_error() {
    let log = MemoryProcessLog::shared();
    let w = worker(EvaluationType::Objective, json!("x"), vec![], log);
    let r = w.process_case(&case(json!({"case_id": "o2", "sql": "q"})), 0).await;
    assert_eq!(r.status(), CaseStatus::Error);
    assert!(r.final_result.is_none());
}

#[tokio::test]
async fn hybrid_majority_of_replying_judges() {
    let log = MemoryProcessLog::shared();
    let judges = vec![
        judge("j1", r#"{"answer": "Yes"}"#),
        judge("j2", r#"{"answer": "no"}"#),
        Judge::new("j3", Arc::new(FakeClient::failing("j3", "upstream 500"))),
    ];
    let w = worker(EvaluationType::Hybrid, json!("SELECT id FROM t"), judges, log.clone());
    let r = w.process_case(&case(json!({"case_id": "h1", "sql": "SELECT * FROM t"})), 0).await;

    // One yes, one no, one failure: tie over the replies goes to true.
    assert_eq!(r.final_result, Some(FinalVerdict::Bool(true)));
    let a = &r.attempts[0];
    assert_eq!(a.outcome, Some(RunOutcome::Bool(true)));
    assert_eq!(a.judges.len(), 3);
    assert!(a.judges[2].is_none());
    assert_eq!(a.judges[1].as_ref().map(|v| &v.value), Some(&VerdictValue::Bool(false)));

    let lines = log.entries();
    assert!(lines
        .iter()
        .any(|l| l.contains("judge prompt: Did fixed-model answer SELECT * FROM t with SELECT id FROM t?")));
}

#[tokio::test]
async fn hybrid_without_judges_is_unavailable() {
    let log = MemoryProcessLog::shared();
    let w = worker(EvaluationType::Hybrid, json!("x"), vec![], log);
    let r = w.process_case(&case(json!({"case_id": "h2", "sql": "q"})), 0).await;
    assert_eq!(r.status(), CaseStatus::Error);
    assert!(r.attempts.iter().all(|a| a.outcome.is_none()));
}

#[tokio::test]
async fn subjective_keeps_per_judge_sets_and_reduces_two_levels() {
    let log = MemoryProcessLog::shared();
    let judges = vec![
        judge("j1", r#"{"matched_rule_ids": [1, 2]}"#),
        judge("j2", r#"{"matched_rule_ids": "[\"1\", \"3\"]"}"#),
        judge("j3", "no idea"),
    ];
    let w = worker(EvaluationType::Subjective, json!("SELECT id FROM t"), judges, log);
    let r = w.process_case(&case(json!({"case_id": "s1", "sql": "SELECT * FROM t"})), 0).await;

    let a = &r.attempts[0];
    // Malformed reply still counts as an empty vote.
    assert_eq!(
        a.outcome,
        Some(RunOutcome::JudgeRules(vec![rule_set(["1", "2"]), rule_set(["1", "3"]), RuleSet::new()]))
    );
    // Per run: threshold 2 of 3 keeps only "1"; every run agrees.
    assert_eq!(r.final_result, Some(FinalVerdict::Rules(rule_set(["1"]))));
    assert_eq!(r.status(), CaseStatus::Scored);
}
