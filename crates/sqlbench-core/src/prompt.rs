use crate::model::TestCase;
use serde_json::Value;

pub trait PromptBuilder: Send + Sync {
    fn target_prompt(&self, capability: &str, indicator: &str, case: &TestCase) -> anyhow::Result<String>;

    fn judge_prompt(
        &self,
        model: &str,
        capability: &str,
        indicator: &str,
        case: &TestCase,
        answer: &Value,
    ) -> anyhow::Result<String>;
}

/// `{{name}}` substitution over the case fields plus `answer`, `model`,
/// `capability`, `indicator` and `case_id`. Unknown placeholders are left
/// as they are.
#[derive(Debug, Clone)]
pub struct TemplatePromptBuilder {
    pub target_template: String,
    pub judge_template: Option<String>,
}

impl TemplatePromptBuilder {
    pub fn new(target_template: impl Into<String>, judge_template: Option<String>) -> Self {
        Self {
            target_template: target_template.into(),
            judge_template,
        }
    }
}

fn render_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn render(template: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = after[..end].trim();
                match lookup(key) {
                    Some(val) => out.push_str(&val),
                    None => out.push_str(&rest[start..start + 2 + end + 2]),
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

impl PromptBuilder for TemplatePromptBuilder {
    fn target_prompt(&self, capability: &str, indicator: &str, case: &TestCase) -> anyhow::Result<String> {
        Ok(render(&self.target_template, |key| match key {
            "capability" => Some(capability.to_string()),
            "indicator" => Some(indicator.to_string()),
            "case_id" => Some(case.case_id.clone()),
            _ => case.get(key).map(render_value),
        }))
    }

    fn judge_prompt(
        &self,
        model: &str,
        capability: &str,
        indicator: &str,
        case: &TestCase,
        answer: &Value,
    ) -> anyhow::Result<String> {
        let template = self
            .judge_template
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("indicator {}/{} has no judge prompt", capability, indicator))?;
        Ok(render(template, |key| match key {
            "answer" => Some(render_value(answer)),
            "model" => Some(model.to_string()),
            "capability" => Some(capability.to_string()),
            "indicator" => Some(indicator.to_string()),
            "case_id" => Some(case.case_id.clone()),
            _ => case.get(key).map(render_value),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn case() -> TestCase {
        serde_json::from_value(json!({
            "case_id": "c1",
            "sql": "SELECT * FROM t",
            "expected": {"rows": [1, 2]}
        }))
        .unwrap()
    }

    #[test]
    fn fills_case_fields_and_keeps_unknown_placeholders() {
        let b = TemplatePromptBuilder::new("[{{capability}}] {{ sql }} -> {{expected}} {{missing}}", None);
        let p = b.target_prompt("opt", "rewrite", &case()).unwrap();
        assert_eq!(p, r#"[opt] SELECT * FROM t -> {"rows":[1,2]} {{missing}}"#);
    }

    #[test]
    fn judge_prompt_sees_answer_and_model() {
        let b = TemplatePromptBuilder::new("", Some("{{model}} said {{answer}} for {{sql}}".into()));
        let p = b
            .judge_prompt("gpt-x", "opt", "rewrite", &case(), &json!("SELECT id FROM t"))
            .unwrap();
        assert_eq!(p, "gpt-x said SELECT id FROM t for SELECT * FROM t");
    }

    #[test]
    fn missing_judge_template_is_an_error() {
        let b = TemplatePromptBuilder::new("x", None);
        assert!(b.judge_prompt("m", "c", "i", &case(), &json!(1)).is_err());
        assert_eq!(render("open {{ end", |_| None), "open {{ end");
    }
}
