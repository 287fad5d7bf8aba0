pub const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS runs (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  suite TEXT NOT NULL,
  target TEXT NOT NULL,
  started_at TEXT NOT NULL,
  finished_at TEXT,
  status TEXT NOT NULL,
  config_json TEXT
);

CREATE TABLE IF NOT EXISTS case_results (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  run_id INTEGER NOT NULL REFERENCES runs(id),
  indicator TEXT NOT NULL,
  evaluation_type TEXT NOT NULL,
  case_id TEXT NOT NULL,
  case_index INTEGER NOT NULL,
  status TEXT NOT NULL,
  success INTEGER NOT NULL,
  final_json TEXT,
  error TEXT,
  duration_ms INTEGER,
  attempts_json TEXT NOT NULL,
  prompt_fingerprint TEXT
);

CREATE INDEX IF NOT EXISTS idx_case_results_run ON case_results(run_id, indicator, case_index);
"#;
