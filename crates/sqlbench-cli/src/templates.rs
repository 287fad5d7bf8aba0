pub const BENCH_YAML: &str = r#"version: 1
suite: sample
settings:
  case_execution_times: 3
  max_concurrent_cases: 3
  max_concurrent_judges: 5
  judge_timeout_seconds: 120
  request_timeout_seconds: 300
  retry:
    times: 3
    delay_seconds: 60

# Swap the fake provider for a real one:
#   provider: openai
#   model: gpt-4o-mini
#   api_key_env: OPENAI_API_KEY
target:
  type: llm
  provider: fake
  model: sample-model
  responses: ["3"]

judges:
  - key: judge-a
    provider: fake
    model: sample-judge
    responses: ['{"answer": "yes"}']

indicators:
  - capability: sql_understanding
    name: row_count
    dataset: datasets/understanding.jsonl
    evaluation_type: objective
    prompt_file: prompts/understanding.txt
  - capability: sql_understanding
    name: explanation
    dataset: datasets/understanding.jsonl
    evaluation_type: hybrid
    prompt_file: prompts/understanding.txt
    judge_prompt_file: prompts/judge.txt
"#;

pub const TARGET_PROMPT: &str = r#"You are a SQL expert. Read the schema and query below.

Schema:
{{create_table_statements}}

Query:
{{sql}}

{{question}}
Reply with the answer only.
"#;

pub const JUDGE_PROMPT: &str = r#"You are grading the answer of model {{model}}.

Query:
{{sql}}

Question: {{question}}
Expected: {{expected}}
Model answer: {{answer}}

Reply with JSON: {"answer": "yes"} if the model answer is correct, otherwise {"answer": "no"}.
"#;

pub const SAMPLE_DATASET: &str = r#"{"case_id": "u-1", "create_table_statements": "CREATE TABLE t (id INT)", "sql": "SELECT COUNT(*) FROM t", "question": "t holds ids 1, 2 and 3. What does the query return?", "expected": 3}
{"case_id": "u-2", "create_table_statements": "CREATE TABLE t (id INT)", "sql": "SELECT MAX(id) FROM t", "question": "t holds ids 1, 2 and 3. What does the query return?", "expected": "3.0"}
"#;
