use crate::model::TestCase;
use serde_json::{Map, Value};
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Loads one case per JSONL line. Blank lines are skipped, malformed lines
/// are logged and skipped, and a missing `case_id` becomes `case_<index>`.
pub fn load_cases(path: &Path) -> anyhow::Result<Vec<TestCase>> {
    let file = std::fs::File::open(path)
        .map_err(|e| anyhow::anyhow!("failed to open dataset {}: {}", path.display(), e))?;
    let reader = BufReader::new(file);

    let mut cases = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = i + 1;
        if line.trim().is_empty() {
            continue;
        }

        let mut fields: Map<String, Value> = match serde_json::from_str(&line) {
            Ok(Value::Object(m)) => m,
            Ok(_) => {
                tracing::warn!(file = %path.display(), line = line_no, "dataset line is not a JSON object, skipped");
                continue;
            }
            Err(e) => {
                tracing::warn!(file = %path.display(), line = line_no, error = %e, "malformed dataset line, skipped");
                continue;
            }
        };

        let case_id = match fields.remove("case_id") {
            Some(Value::String(s)) if !s.trim().is_empty() => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => format!("case_{}", cases.len()),
        };
        cases.push(TestCase::new(case_id, fields));
    }

    tracing::info!(file = %path.display(), cases = cases.len(), "dataset loaded");
    Ok(cases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn skips_blank_and_malformed_lines() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, r#"{{"case_id": "a", "sql": "select 1"}}"#).unwrap();
        writeln!(f).unwrap();
        writeln!(f, "{{not json").unwrap();
        writeln!(f, r#"{{"sql": "select 2"}}"#).unwrap();
        writeln!(f, r#"{{"case_id": 7, "sql": "select 3"}}"#).unwrap();
        writeln!(f, "[1, 2]").unwrap();

        let cases = load_cases(f.path()).unwrap();
        let ids: Vec<&str> = cases.iter().map(|c| c.case_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "case_1", "7"]);
        assert_eq!(cases[1].get_str("sql"), Some("select 2"));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_cases(Path::new("/nonexistent/cases.jsonl")).is_err());
    }
}
