//! Exact comparison of a target answer against the case's expected value.

use bigdecimal::BigDecimal;
use serde_json::Value;
use sqlbench_core::evaluator::{Evaluator, RunContext, RunEvaluation};
use sqlbench_core::model::{EvaluationType, RunOutcome};
use async_trait::async_trait;
use std::str::FromStr;

pub struct ObjectiveEvaluator;

#[async_trait]
impl Evaluator for ObjectiveEvaluator {
    fn kind(&self) -> EvaluationType {
        EvaluationType::Objective
    }

    async fn evaluate(&self, ctx: &RunContext<'_>, answer: &Value) -> anyhow::Result<RunEvaluation> {
        let Some(expected) = ctx.case.expected() else {
            anyhow::bail!("[{}] case has no expected answer", ctx.case_id());
        };
        ctx.process_log.record(&format!(
            "[{}] Objective eval: answer '{}', expected '{}'",
            ctx.case_id(),
            answer,
            expected
        ));
        let ok = deep_equal(&normalize_top(answer), &normalize_top(expected));
        Ok(RunEvaluation::unjudged(RunOutcome::Bool(ok)))
    }
}

/// Trims and lowercases a bare string answer. Nested strings are left alone.
fn normalize_top(v: &Value) -> Value {
    match v {
        Value::String(s) => Value::String(s.trim().to_lowercase()),
        other => other.clone(),
    }
}

/// Structural equality where numbers and numeric-looking strings compare
/// by decimal value.
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, va)| y.get(k).is_some_and(|vb| deep_equal(va, vb)))
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(va, vb)| deep_equal(va, vb))
        }
        _ => match (as_decimal(a), as_decimal(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
    }
}

fn as_decimal(v: &Value) -> Option<BigDecimal> {
    match v {
        Value::Number(n) => BigDecimal::from_str(&n.to_string()).ok(),
        Value::String(s) => BigDecimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_strings_compare_by_value() {
        assert!(deep_equal(&json!("100.00"), &json!(100.0)));
        assert!(deep_equal(&json!("1e2"), &json!(100)));
        assert!(deep_equal(&json!("1E2"), &json!("100.00")));
        assert!(!deep_equal(&json!("100.01"), &json!(100)));
    }

    #[test]
    fn padded_numeric_strings_still_coerce() {
        assert!(deep_equal(&json!([" 42 "]), &json!([42])));
        assert!(deep_equal(&json!({"n": "\t7.50\n"}), &json!({"n": 7.5})));
        assert!(!deep_equal(&json!([" foo "]), &json!(["foo"])));
    }

    #[test]
    fn sequences_compare_element_wise() {
        assert!(deep_equal(&json!([42, "42.0", "foo"]), &json!(["42", "42.0", "foo"])));
        assert!(!deep_equal(&json!([1, 2]), &json!([2, 1])));
        assert!(!deep_equal(&json!([1, 2]), &json!([1, 2, 3])));
    }

    #[test]
    fn maps_need_identical_key_sets() {
        assert!(!deep_equal(&json!({"a": 1}), &json!({"a": 1, "b": 2})));
        assert!(!deep_equal(&json!({"a": 1}), &json!({"b": 1})));
        assert!(deep_equal(&json!({"a": "1.0", "b": [2]}), &json!({"b": ["2"], "a": 1})));
    }

    #[test]
    fn non_numeric_falls_back_to_native_equality() {
        assert!(deep_equal(&json!(true), &json!(true)));
        assert!(!deep_equal(&json!(true), &json!(1)));
        assert!(!deep_equal(&json!("foo"), &json!("bar")));
        assert!(!deep_equal(&json!(null), &json!("null")));
    }

    #[test]
    fn top_level_strings_are_trimmed_and_folded() {
        let norm = |v: Value| normalize_top(&v);
        assert!(deep_equal(&norm(json!("  SELECT 1 ")), &norm(json!("select 1"))));
        assert!(!deep_equal(&norm(json!(["FOO"])), &norm(json!(["foo"]))));
    }
}
