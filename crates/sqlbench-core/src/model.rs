use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;

/// One benchmark probe. `case_id` plus whatever fields the dataset carries
/// (sql, dialects, expected answer, rule list). Read-only to the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TestCase {
    pub case_id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl TestCase {
    pub fn new(case_id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            case_id: case_id.into(),
            fields,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(|v| v.as_str())
    }

    pub fn expected(&self) -> Option<&Value> {
        self.fields.get("expected").filter(|v| !v.is_null())
    }

    /// Rule ids listed under `expected.optimization_rules`.
    pub fn expected_rules(&self) -> Vec<ExpectedRule> {
        self.expected()
            .and_then(|e| e.get("optimization_rules"))
            .and_then(|r| r.as_array())
            .map(|rules| {
                rules
                    .iter()
                    .filter_map(|r| {
                        let id = RuleId::from_value(r.get("rule_id")?)?;
                        Some(ExpectedRule {
                            rule_id: id,
                            difficulty_level: difficulty_of(r),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn difficulty_level(&self) -> String {
        self.fields
            .get("difficulty_level")
            .map(render_scalar)
            .unwrap_or_else(|| "0".into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedRule {
    pub rule_id: RuleId,
    pub difficulty_level: String,
}

fn difficulty_of(v: &Value) -> String {
    v.get("difficulty_level")
        .map(render_scalar)
        .unwrap_or_else(|| "0".into())
}

fn render_scalar(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// How an indicator file is scored. Chosen once per indicator, never per case.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationType {
    Objective,
    Hybrid,
    Subjective,
}

impl EvaluationType {
    pub fn is_judged(&self) -> bool {
        !matches!(self, EvaluationType::Objective)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationType::Objective => "objective",
            EvaluationType::Hybrid => "hybrid",
            EvaluationType::Subjective => "subjective",
        }
    }
}

impl fmt::Display for EvaluationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical rule identifier. Numeric and string ids (`1` vs `"1"`) collapse
/// to the same value at ingestion.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(String);

impl RuleId {
    pub fn new(raw: &str) -> Self {
        RuleId(raw.trim().to_string())
    }

    pub fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Null => None,
            Value::String(s) => Some(RuleId::new(s)),
            other => Some(RuleId(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RuleId {
    fn from(s: &str) -> Self {
        RuleId::new(s)
    }
}

pub type RuleSet = BTreeSet<RuleId>;

/// Builds a rule set from anything string-like. Handy in tests and configs.
pub fn rule_set<I, S>(ids: I) -> RuleSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    ids.into_iter().map(|s| RuleId::new(s.as_ref())).collect()
}

/// One judge's opinion on one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeVerdict {
    pub judge: String,
    pub value: VerdictValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictValue {
    Bool(bool),
    Rules(RuleSet),
}

/// Evaluation outcome of a single run.
///
/// Subjective runs keep every judge's rule set; reduction across judges is
/// deferred to the case-level reducer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Bool(bool),
    JudgeRules(Vec<RuleSet>),
}

/// Reduced case-level verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalVerdict {
    Bool(bool),
    Rules(RuleSet),
}

impl FinalVerdict {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FinalVerdict::Bool(b) => Some(*b),
            FinalVerdict::Rules(_) => None,
        }
    }

    pub fn rules(&self) -> Option<&RuleSet> {
        match self {
            FinalVerdict::Rules(r) => Some(r),
            FinalVerdict::Bool(_) => None,
        }
    }

    pub fn matches_rule(&self, id: &RuleId) -> bool {
        self.rules().is_some_and(|r| r.contains(id))
    }
}

impl fmt::Display for FinalVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinalVerdict::Bool(b) => write!(f, "{}", b),
            FinalVerdict::Rules(r) => {
                let ids: Vec<&str> = r.iter().map(|id| id.as_str()).collect();
                write!(f, "[{}]", ids.join(", "))
            }
        }
    }
}

pub const ANSWER_ERROR_PREFIX: &str = "ERROR: ";

/// One execution of a case. Failed runs keep their slot with an error marker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunAttempt {
    pub run_idx: u32,
    pub model_answer: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_error: Option<String>,
    pub outcome: Option<RunOutcome>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub judges: Vec<Option<JudgeVerdict>>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

impl RunAttempt {
    pub fn answered(run_idx: u32, answer: Value) -> Self {
        Self {
            run_idx,
            model_answer: answer,
            answer_error: None,
            outcome: None,
            judges: Vec::new(),
            duration_ms: None,
        }
    }

    pub fn failed(run_idx: u32, error: impl fmt::Display) -> Self {
        let msg = error.to_string();
        Self {
            run_idx,
            model_answer: Value::String(format!("{}{}", ANSWER_ERROR_PREFIX, msg)),
            answer_error: Some(msg),
            outcome: None,
            judges: Vec::new(),
            duration_ms: None,
        }
    }

    pub fn is_answer_failure(&self) -> bool {
        self.answer_error.is_some()
    }
}

/// Aggregate of all runs of one case. Terminal once built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseResult {
    pub case_id: String,
    pub case_index: usize,
    pub success: bool,
    pub attempts: Vec<RunAttempt>,
    pub final_result: Option<FinalVerdict>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

impl CaseResult {
    pub fn failed(
        case_id: impl Into<String>,
        case_index: usize,
        attempts: Vec<RunAttempt>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            case_id: case_id.into(),
            case_index,
            success: false,
            attempts,
            final_result: None,
            error: Some(error.into()),
            duration_ms: None,
        }
    }

    pub fn status(&self) -> CaseStatus {
        match (&self.final_result, self.success) {
            (Some(FinalVerdict::Bool(true)), true) => CaseStatus::Pass,
            (Some(FinalVerdict::Bool(false)), true) => CaseStatus::Fail,
            (Some(FinalVerdict::Rules(_)), true) => CaseStatus::Scored,
            _ => CaseStatus::Error,
        }
    }
}

/// Display status. `Error` (no verdict) is never folded into `Fail`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Pass,
    Fail,
    Scored,
    Error,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Pass => "pass",
            CaseStatus::Fail => "fail",
            CaseStatus::Scored => "scored",
            CaseStatus::Error => "error",
        }
    }
}
