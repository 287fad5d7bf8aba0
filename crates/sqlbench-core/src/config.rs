use crate::errors::ConfigError;
use crate::model::EvaluationType;
use crate::providers::task::app::ApplicationKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SUPPORTED_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    pub suite: String,
    #[serde(default)]
    pub settings: Settings,
    pub target: TargetConfig,
    #[serde(default)]
    pub judges: Vec<JudgeConfig>,
    pub indicators: Vec<IndicatorConfig>,
}

fn default_version() -> u32 {
    SUPPORTED_CONFIG_VERSION
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Runs per case. Odd values avoid boolean ties.
    pub case_execution_times: u32,
    pub max_concurrent_cases: usize,
    pub max_concurrent_judges: usize,
    pub judge_timeout_seconds: u64,
    pub retry: RetrySettings,
    pub request_timeout_seconds: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            case_execution_times: 3,
            max_concurrent_cases: 3,
            max_concurrent_judges: 5,
            judge_timeout_seconds: 120,
            retry: RetrySettings::default(),
            request_timeout_seconds: 300,
        }
    }
}

impl Settings {
    pub fn judge_timeout(&self) -> Duration {
        Duration::from_secs(self.judge_timeout_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub times: u32,
    pub delay_seconds: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            times: 3,
            delay_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Openai,
    /// Azure OpenAI: `api_url` is the resource endpoint, `api_version` is required.
    Azure,
    Fake,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TargetConfig {
    Llm(LlmSpec),
    Application(ApplicationSpec),
}

impl TargetConfig {
    pub fn display_name(&self) -> String {
        match self {
            TargetConfig::Llm(spec) => spec.model.clone(),
            TargetConfig::Application(app) => match app.kind {
                ApplicationKind::Optimize => "application:optimize".into(),
                ApplicationKind::Convert => "application:convert".into(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSpec {
    pub provider: ProviderKind,
    pub model: String,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    /// Azure deployment name; defaults to `model`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<String>,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Scripted replies for the `fake` provider.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub responses: Vec<String>,
}

fn default_max_tokens() -> u32 {
    4096
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeConfig {
    pub key: String,
    pub provider: ProviderKind,
    pub model: String,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<String>,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub responses: Vec<String>,
}

impl JudgeConfig {
    pub fn spec(&self) -> LlmSpec {
        LlmSpec {
            provider: self.provider,
            model: self.model.clone(),
            api_url: self.api_url.clone(),
            api_key_env: self.api_key_env.clone(),
            api_version: self.api_version.clone(),
            deployment: self.deployment.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            responses: self.responses.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationSpec {
    pub kind: ApplicationKind,
    pub api_url: String,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub submit_path: Option<String>,
    #[serde(default)]
    pub result_path: Option<String>,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    #[serde(default = "default_max_wait")]
    pub max_wait_seconds: u64,
    #[serde(default = "default_true")]
    pub skip_index_advice: bool,
}

fn default_poll_interval() -> u64 {
    30
}

fn default_max_wait() -> u64 {
    20 * 60
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorConfig {
    pub capability: String,
    pub name: String,
    pub dataset: PathBuf,
    pub evaluation_type: EvaluationType,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub prompt_file: Option<PathBuf>,
    #[serde(default)]
    pub judge_prompt: Option<String>,
    #[serde(default)]
    pub judge_prompt_file: Option<PathBuf>,
}

impl IndicatorConfig {
    pub fn label(&self) -> String {
        format!("{}/{}", self.capability, self.name)
    }
}

pub fn load_config(path: &Path, strict: bool) -> Result<BenchConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read config {}: {}", path.display(), e)))?;

    let mut ignored_keys: HashSet<String> = HashSet::new();
    let deserializer = serde_yaml::Deserializer::from_str(&raw);
    let mut cfg: BenchConfig = serde_ignored::deserialize(deserializer, |p| {
        ignored_keys.insert(p.to_string());
    })
    .map_err(|e| ConfigError(format!("failed to parse YAML: {}", e)))?;

    let unknown: BTreeSet<&String> = ignored_keys
        .iter()
        .filter(|k| !k.starts_with('_') && !k.starts_with("x-"))
        .collect();
    if !unknown.is_empty() {
        if strict {
            return Err(ConfigError(format!(
                "Unknown fields detected in strict mode: {:?} (file: {})",
                unknown,
                path.display()
            )));
        }
        tracing::warn!(fields = ?unknown, file = %path.display(), "ignored unknown config fields");
    }

    if cfg.version != SUPPORTED_CONFIG_VERSION {
        return Err(ConfigError(format!(
            "unsupported config version {} (supported: {})",
            cfg.version, SUPPORTED_CONFIG_VERSION
        )));
    }

    resolve_paths(&mut cfg, path)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Dataset and prompt files are relative to the config file. Prompt files
/// are read into the inline fields.
fn resolve_paths(cfg: &mut BenchConfig, config_path: &Path) -> Result<(), ConfigError> {
    let base = config_path.parent().unwrap_or(Path::new("."));
    let resolve = |p: &Path| -> PathBuf {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            base.join(p)
        }
    };
    let read = |p: &Path| -> Result<String, ConfigError> {
        std::fs::read_to_string(p)
            .map_err(|e| ConfigError(format!("failed to read prompt {}: {}", p.display(), e)))
    };

    for ind in &mut cfg.indicators {
        ind.dataset = resolve(&ind.dataset);
        if let Some(f) = ind.prompt_file.take() {
            let f = resolve(&f);
            ind.prompt = Some(read(&f)?);
            ind.prompt_file = Some(f);
        }
        if let Some(f) = ind.judge_prompt_file.take() {
            let f = resolve(&f);
            ind.judge_prompt = Some(read(&f)?);
            ind.judge_prompt_file = Some(f);
        }
    }
    Ok(())
}

pub fn validate(cfg: &BenchConfig) -> Result<(), ConfigError> {
    let s = &cfg.settings;
    if s.case_execution_times < 1 {
        return Err(ConfigError("settings.case_execution_times must be >= 1".into()));
    }
    if s.max_concurrent_cases < 1 {
        return Err(ConfigError("settings.max_concurrent_cases must be >= 1".into()));
    }
    if s.case_execution_times % 2 == 0 {
        tracing::warn!(
            case_execution_times = s.case_execution_times,
            "even run count; boolean ties resolve to true"
        );
    }
    if cfg.indicators.is_empty() {
        return Err(ConfigError("config has no indicators".into()));
    }

    match &cfg.target {
        TargetConfig::Llm(spec) => validate_llm("target", spec)?,
        TargetConfig::Application(app) => {
            if app.poll_interval_seconds == 0 {
                return Err(ConfigError("target.poll_interval_seconds must be >= 1".into()));
            }
            if app.max_wait_seconds == 0 {
                return Err(ConfigError("target.max_wait_seconds must be >= 1".into()));
            }
        }
    }

    let mut keys = HashSet::new();
    for j in &cfg.judges {
        if !keys.insert(j.key.as_str()) {
            return Err(ConfigError(format!("duplicate judge key '{}'", j.key)));
        }
        validate_llm(&format!("judge {}", j.key), &j.spec())?;
    }

    for ind in &cfg.indicators {
        let has_prompt = ind.prompt.as_deref().is_some_and(|p| !p.trim().is_empty());
        if !has_prompt && matches!(cfg.target, TargetConfig::Llm(_)) {
            return Err(ConfigError(format!(
                "indicator {} needs a prompt or prompt_file",
                ind.label()
            )));
        }
        if ind.evaluation_type.is_judged() {
            if ind.judge_prompt.as_deref().map_or(true, |p| p.trim().is_empty()) {
                return Err(ConfigError(format!(
                    "indicator {} is {} and needs a judge_prompt",
                    ind.label(),
                    ind.evaluation_type
                )));
            }
            if cfg.judges.is_empty() {
                tracing::warn!(indicator = %ind.label(), "judged indicator with an empty judge roster; every run will lack a verdict");
            }
        }
    }
    Ok(())
}

fn validate_llm(what: &str, spec: &LlmSpec) -> Result<(), ConfigError> {
    if spec.provider == ProviderKind::Azure {
        if spec.api_url.as_deref().map_or(true, |u| u.trim().is_empty()) {
            return Err(ConfigError(format!("{}: azure provider needs api_url", what)));
        }
        if spec.api_version.as_deref().map_or(true, |v| v.trim().is_empty()) {
            return Err(ConfigError(format!("{}: azure provider needs api_version", what)));
        }
    }
    Ok(())
}

/// Reads the key named by `api_key_env`.
pub fn resolve_api_key(env_var: Option<&str>) -> Result<Option<String>, ConfigError> {
    match env_var {
        None => Ok(None),
        Some(name) => std::env::var(name)
            .map(Some)
            .map_err(|_| ConfigError(format!("environment variable {} is not set", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let p = dir.join(name);
        std::fs::write(&p, body).unwrap();
        p
    }

    const BASE: &str = r#"
version: 1
suite: sql_bench
target:
  type: llm
  provider: fake
  model: m1
judges:
  - key: j1
    provider: fake
    model: judge-a
indicators:
  - capability: sql_optimization
    name: rewrite
    dataset: data/rewrite.jsonl
    evaluation_type: hybrid
    prompt: "Optimize {{sql}}"
    judge_prompt: "Is {{answer}} equivalent to {{sql}}?"
"#;

    #[test]
    fn defaults_and_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let p = write(dir.path(), "bench.yaml", BASE);
        let cfg = load_config(&p, true).unwrap();

        assert_eq!(cfg.settings.case_execution_times, 3);
        assert_eq!(cfg.settings.max_concurrent_judges, 5);
        assert_eq!(cfg.settings.retry.delay_seconds, 60);
        assert_eq!(cfg.indicators[0].dataset, dir.path().join("data/rewrite.jsonl"));
        assert_eq!(cfg.indicators[0].evaluation_type, EvaluationType::Hybrid);
    }

    #[test]
    fn strict_mode_rejects_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let body = BASE.replace("suite: sql_bench", "suite: sql_bench\nparallel: 9");
        let p = write(dir.path(), "bench.yaml", &body);

        let err = load_config(&p, true).unwrap_err();
        assert!(err.0.contains("parallel"), "{}", err);
        assert!(load_config(&p, false).is_ok());
    }

    #[test]
    fn judged_indicator_requires_judge_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let body = BASE.replace("    judge_prompt: \"Is {{answer}} equivalent to {{sql}}?\"\n", "");
        let p = write(dir.path(), "bench.yaml", &body);
        let err = load_config(&p, false).unwrap_err();
        assert!(err.0.contains("judge_prompt"), "{}", err);
    }

    #[test]
    fn prompt_files_are_inlined() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "judge.txt", "judge {{answer}}");
        let body = BASE.replace(
            "    judge_prompt: \"Is {{answer}} equivalent to {{sql}}?\"\n",
            "    judge_prompt_file: judge.txt\n",
        );
        let p = write(dir.path(), "bench.yaml", &body);
        let cfg = load_config(&p, false).unwrap();
        assert_eq!(cfg.indicators[0].judge_prompt.as_deref(), Some("judge {{answer}}"));
    }

    #[test]
    fn application_target_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let body = BASE.replace(
            "target:\n  type: llm\n  provider: fake\n  model: m1\n",
            "target:\n  type: application\n  kind: optimize\n  api_url: http://localhost:9000\n",
        );
        let p = write(dir.path(), "bench.yaml", &body);
        let cfg = load_config(&p, false).unwrap();
        match cfg.target {
            TargetConfig::Application(app) => {
                assert_eq!(app.poll_interval_seconds, 30);
                assert_eq!(app.max_wait_seconds, 1200);
                assert!(app.skip_index_advice);
            }
            other => panic!("unexpected target {:?}", other),
        }
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = "target:\n  type: application\n  kind: convert\n  api_url: http://localhost:9000\n";
        let llm = "target:\n  type: llm\n  provider: fake\n  model: m1\n";

        let body = BASE.replace(llm, &format!("{}  poll_interval_seconds: 0\n", app));
        let p = write(dir.path(), "bench.yaml", &body);
        let err = load_config(&p, false).unwrap_err();
        assert!(err.0.contains("poll_interval_seconds"), "{}", err);

        let body = BASE.replace(llm, &format!("{}  max_wait_seconds: 0\n", app));
        let p = write(dir.path(), "bench.yaml", &body);
        let err = load_config(&p, false).unwrap_err();
        assert!(err.0.contains("max_wait_seconds"), "{}", err);
    }

    #[test]
    fn azure_provider_needs_endpoint_and_version() {
        let dir = tempfile::tempdir().unwrap();
        let llm = "target:\n  type: llm\n  provider: fake\n  model: m1\n";

        let body = BASE.replace(llm, "target:\n  type: llm\n  provider: azure\n  model: gpt-4o\n  api_url: https://res.openai.azure.com\n");
        let p = write(dir.path(), "bench.yaml", &body);
        let err = load_config(&p, true).unwrap_err();
        assert!(err.0.contains("api_version"), "{}", err);

        let body = BASE.replace(
            llm,
            "target:\n  type: llm\n  provider: azure\n  model: gpt-4o\n  deployment: prod-4o\n  api_url: https://res.openai.azure.com\n  api_version: \"2024-06-01\"\n",
        );
        let p = write(dir.path(), "bench.yaml", &body);
        let cfg = load_config(&p, true).unwrap();
        match cfg.target {
            TargetConfig::Llm(spec) => {
                assert_eq!(spec.provider, ProviderKind::Azure);
                assert_eq!(spec.deployment.as_deref(), Some("prod-4o"));
                assert_eq!(spec.api_version.as_deref(), Some("2024-06-01"));
            }
            other => panic!("unexpected target {:?}", other),
        }
    }

    #[test]
    fn zero_runs_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let body = BASE.replace(
            "suite: sql_bench",
            "suite: sql_bench\nsettings:\n  case_execution_times: 0",
        );
        let p = write(dir.path(), "bench.yaml", &body);
        assert!(load_config(&p, false).is_err());
    }
}
