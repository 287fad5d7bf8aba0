pub mod llm;
pub mod task;

use serde_json::Value;

/// Drops markdown fence lines. A fence line whose remainder opens a JSON
/// object (```` ```{ ```` ) keeps that remainder.
pub fn strip_code_fences(raw: &str) -> String {
    raw.lines()
        .filter_map(|line| match line.strip_prefix("```") {
            Some(rest) if rest.trim().starts_with('{') => Some(rest),
            Some(_) => None,
            None => Some(line),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parses a model reply as JSON after fence removal, falling back to the
/// cleaned text.
pub fn parse_lenient(raw: &str) -> Value {
    let cleaned = strip_code_fences(raw);
    let unfenced: Vec<&str> = cleaned
        .lines()
        .map(|l| l.strip_suffix("```").unwrap_or(l))
        .collect();
    match serde_json::from_str::<Value>(unfenced.join("\n").trim()) {
        Ok(v) => v,
        Err(_) => Value::String(cleaned),
    }
}
