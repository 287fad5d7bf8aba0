use crate::model::{RuleId, RuleSet};
use crate::providers::parse_lenient;
use serde_json::Value;

/// A judge reply, parsed leniently. Anything that is not a JSON object
/// reads as "no" and as an empty rule set.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgeOutput {
    pub raw: String,
    pub parsed: Value,
}

impl JudgeOutput {
    pub fn parse(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            parsed: parse_lenient(raw),
        }
    }

    /// `answer` containing "yes", case-insensitively.
    pub fn yes_no(&self) -> bool {
        match self.parsed.get("answer") {
            Some(Value::String(s)) => s.to_lowercase().contains("yes"),
            Some(Value::Bool(b)) => *b,
            _ => false,
        }
    }

    /// `matched_rule_ids`, canonicalized. A string holding a list (JSON or
    /// single-quoted) is unpacked; a bare scalar counts as one id.
    pub fn matched_rules(&self) -> RuleSet {
        match self.parsed.get("matched_rule_ids") {
            Some(Value::Array(ids)) => ids.iter().filter_map(RuleId::from_value).collect(),
            Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
                Ok(Value::Array(ids)) => ids.iter().filter_map(RuleId::from_value).collect(),
                _ if s.trim().is_empty() => RuleSet::new(),
                _ => match list_literal(s) {
                    Some(items) => items.iter().map(|id| RuleId::new(id)).collect(),
                    None => std::iter::once(RuleId::new(s)).collect(),
                },
            },
            Some(Value::Number(n)) => std::iter::once(RuleId::new(&n.to_string())).collect(),
            _ => RuleSet::new(),
        }
    }
}

/// Items of a bracketed list that is not valid JSON, e.g. `['1', '2']`.
fn list_literal(s: &str) -> Option<Vec<&str>> {
    let inner = s.trim().strip_prefix('[')?.strip_suffix(']')?;
    let items = inner
        .split(',')
        .map(|item| item.trim().trim_matches(|c| c == '\'' || c == '"').trim())
        .filter(|item| !item.is_empty())
        .collect();
    Some(items)
}
