pub mod console;
pub mod json;

use crate::model::{CaseResult, CaseStatus, EvaluationType, FinalVerdict, TestCase};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One scored line of an indicator report. Subjective cases expand to one
/// row per expected rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetailRow {
    pub case_id: String,
    pub case_index: usize,
    pub status: CaseStatus,
    pub difficulty_level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    pub model_answers: Vec<Value>,
    /// `None` when the case produced no verdict.
    pub passed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_result: Option<FinalVerdict>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IndicatorSummary {
    pub cases: usize,
    pub rows: usize,
    pub passed: usize,
    pub failed_verdict: usize,
    pub errored: usize,
    /// `passed / (passed + failed_verdict)`; errored rows are excluded.
    pub pass_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorReport {
    pub capability: String,
    pub name: String,
    pub evaluation_type: EvaluationType,
    pub summary: IndicatorSummary,
    pub details: Vec<DetailRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub suite: String,
    pub target: String,
    pub run_id: i64,
    pub started_at: String,
    pub indicators: Vec<IndicatorReport>,
    /// Indicators that could not run at all (unreadable dataset, store error).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedIndicator>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkippedIndicator {
    pub capability: String,
    pub name: String,
    pub error: String,
}

impl RunReport {
    /// A skipped indicator counts as a failure.
    pub fn any_failed(&self) -> bool {
        !self.skipped.is_empty()
            || self
                .indicators
                .iter()
                .any(|i| i.summary.failed_verdict > 0 || i.summary.errored > 0)
    }
}

impl IndicatorReport {
    /// `cases` and `results` are parallel, in input order.
    pub fn build(
        capability: &str,
        name: &str,
        kind: EvaluationType,
        cases: &[TestCase],
        results: &[CaseResult],
    ) -> Self {
        let details: Vec<DetailRow> = cases
            .iter()
            .zip(results)
            .flat_map(|(case, result)| detail_rows(kind, case, result))
            .collect();
        let summary = summarize(results.len(), &details);
        Self {
            capability: capability.to_string(),
            name: name.to_string(),
            evaluation_type: kind,
            summary,
            details,
        }
    }
}

fn detail_rows(kind: EvaluationType, case: &TestCase, result: &CaseResult) -> Vec<DetailRow> {
    let answers: Vec<Value> = result.attempts.iter().map(|a| a.model_answer.clone()).collect();
    let base = DetailRow {
        case_id: result.case_id.clone(),
        case_index: result.case_index,
        status: result.status(),
        difficulty_level: case.difficulty_level(),
        rule_id: None,
        model_answers: answers,
        passed: result.final_result.as_ref().and_then(FinalVerdict::as_bool),
        final_result: result.final_result.clone(),
        error: result.error.clone(),
    };

    if kind != EvaluationType::Subjective {
        return vec![base];
    }

    let rules = case.expected_rules();
    if rules.is_empty() {
        return vec![base];
    }
    rules
        .into_iter()
        .map(|rule| DetailRow {
            rule_id: Some(rule.rule_id.to_string()),
            difficulty_level: rule.difficulty_level,
            passed: result
                .final_result
                .as_ref()
                .map(|f| f.matches_rule(&rule.rule_id)),
            ..base.clone()
        })
        .collect()
}

fn summarize(cases: usize, rows: &[DetailRow]) -> IndicatorSummary {
    let mut s = IndicatorSummary {
        cases,
        rows: rows.len(),
        ..Default::default()
    };
    for r in rows {
        match r.passed {
            Some(true) => s.passed += 1,
            Some(false) => s.failed_verdict += 1,
            None => s.errored += 1,
        }
    }
    let scored = s.passed + s.failed_verdict;
    if scored > 0 {
        s.pass_rate = Some(s.passed as f64 / scored as f64);
    }
    s
}
