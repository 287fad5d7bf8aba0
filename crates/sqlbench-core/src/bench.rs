//! Wires a bench config into targets, judges, workers and the store, and
//! runs every indicator in order.

use crate::config::{BenchConfig, IndicatorConfig, TargetConfig};
use crate::dataset::load_cases;
use crate::engine::{ApplicationTarget, CaseScheduler, CaseWorker, LlmTarget, RetryPolicy, Target};
use crate::errors::ConfigError;
use crate::evaluator::Evaluator;
use crate::fingerprint;
use crate::judge::{Judge, JudgePool, JudgePoolSettings};
use crate::model::{CaseResult, EvaluationType};
use crate::process_log::SharedProcessLog;
use crate::prompt::{PromptBuilder, TemplatePromptBuilder};
use crate::providers::llm::build_client;
use crate::providers::task::app::ApplicationClient;
use crate::providers::task::{PollSettings, TaskPoller};
use crate::report::{IndicatorReport, RunReport, SkippedIndicator};
use crate::storage::store::{IndicatorKey, Store};
use std::sync::Arc;
use std::time::Duration;

pub type EvaluatorFactory = Arc<dyn Fn(EvaluationType) -> Arc<dyn Evaluator> + Send + Sync>;

pub fn retry_policy(cfg: &BenchConfig) -> RetryPolicy {
    RetryPolicy::new(
        cfg.settings.retry.times,
        Duration::from_secs(cfg.settings.retry.delay_seconds),
    )
}

pub fn build_target(cfg: &BenchConfig) -> Result<Arc<dyn Target>, ConfigError> {
    let retry = retry_policy(cfg);
    match &cfg.target {
        TargetConfig::Llm(spec) => {
            let client = build_client(spec, cfg.settings.request_timeout())?;
            Ok(Arc::new(LlmTarget::new(client, retry)))
        }
        TargetConfig::Application(app) => {
            let api_key = crate::config::resolve_api_key(app.api_key_env.as_deref())?;
            let http = reqwest::Client::builder()
                .timeout(cfg.settings.request_timeout())
                .build()
                .map_err(|e| ConfigError(format!("failed to build HTTP client: {}", e)))?;
            let poller = TaskPoller::new(
                http,
                api_key,
                PollSettings {
                    interval: Duration::from_secs(app.poll_interval_seconds),
                    max_wait: Duration::from_secs(app.max_wait_seconds),
                    fetch_timeout: cfg.settings.request_timeout(),
                },
            );
            let mut client = ApplicationClient::new(app.kind, app.api_url.clone(), poller);
            if let Some(p) = &app.submit_path {
                client.submit_path = p.clone();
            }
            if let Some(p) = &app.result_path {
                client.result_path = p.clone();
            }
            client.skip_index_advice = app.skip_index_advice;
            Ok(Arc::new(ApplicationTarget::new(
                client,
                retry,
                cfg.target.display_name(),
            )))
        }
    }
}

pub fn build_judges(cfg: &BenchConfig) -> Result<Vec<Judge>, ConfigError> {
    cfg.judges
        .iter()
        .map(|j| Ok(Judge::new(j.key.clone(), build_client(&j.spec(), cfg.settings.request_timeout())?)))
        .collect()
}

pub struct BenchRunner {
    pub config: BenchConfig,
    pub target: Arc<dyn Target>,
    pub judges: Vec<Judge>,
    pub store: Store,
    pub process_log: SharedProcessLog,
    pub evaluators: EvaluatorFactory,
}

impl BenchRunner {
    pub fn from_config(
        config: BenchConfig,
        store: Store,
        process_log: SharedProcessLog,
        evaluators: EvaluatorFactory,
    ) -> Result<Self, ConfigError> {
        let target = build_target(&config)?;
        let judges = build_judges(&config)?;
        Ok(Self {
            config,
            target,
            judges,
            store,
            process_log,
            evaluators,
        })
    }

    fn judge_pool(&self) -> JudgePool {
        let s = &self.config.settings;
        JudgePool::new(
            self.judges.clone(),
            JudgePoolSettings {
                max_concurrent: s.max_concurrent_judges,
                timeout: s.judge_timeout(),
                retry: retry_policy(&self.config),
            },
        )
        .with_process_log(self.process_log.clone())
    }

    /// Runs every indicator, or only those of capability `only`.
    pub async fn run(&self, only: Option<&str>) -> anyhow::Result<RunReport> {
        let cfg = &self.config;
        let started_at = chrono::Utc::now().to_rfc3339();
        let run_id = self.store.create_run(
            &cfg.suite,
            self.target.name(),
            &serde_json::to_string(cfg)?,
        )?;

        self.process_log.begin(&run_id.to_string());
        tracing::info!(run_id, suite = %cfg.suite, target = %self.target.name(), "run started");

        let mut indicators = Vec::new();
        let mut skipped = Vec::new();
        for ind in &cfg.indicators {
            if only.is_some_and(|cap| cap != ind.capability) {
                continue;
            }
            match self.run_indicator(run_id, ind).await {
                Ok(rep) => indicators.push(rep),
                Err(e) => {
                    let error = format!("{:#}", e);
                    tracing::error!(indicator = %ind.label(), error = %error, "indicator skipped");
                    self.process_log
                        .record(&format!("indicator {} skipped: {}", ind.label(), error));
                    skipped.push(SkippedIndicator {
                        capability: ind.capability.clone(),
                        name: ind.name.clone(),
                        error,
                    });
                }
            }
            self.process_log.flush()?;
        }

        let report = RunReport {
            suite: cfg.suite.clone(),
            target: self.target.name().to_string(),
            run_id,
            started_at,
            indicators,
            skipped,
        };
        let status = if report.any_failed() { "failed" } else { "passed" };
        self.store.finalize_run(run_id, status)?;
        tracing::info!(run_id, status, "run finished");

        self.process_log.flush()?;
        self.process_log.clear();
        Ok(report)
    }

    async fn run_indicator(&self, run_id: i64, ind: &IndicatorConfig) -> anyhow::Result<IndicatorReport> {
        let s = &self.config.settings;
        let cases = load_cases(&ind.dataset)?;
        let evaluator = (self.evaluators)(ind.evaluation_type);
        let prompts: Arc<dyn PromptBuilder> = Arc::new(TemplatePromptBuilder::new(
            ind.prompt.clone().unwrap_or_default(),
            ind.judge_prompt.clone(),
        ));

        self.process_log.record(&format!(
            "--- Capability: {} Indicator {} Evaluating Type: {} ---",
            ind.capability, ind.name, ind.evaluation_type
        ));
        self.process_log.record(&format!(
            "Concurrency: {} concurrent cases, {} judges",
            s.max_concurrent_cases,
            self.judges.len()
        ));

        let worker = Arc::new(CaseWorker {
            target: self.target.clone(),
            evaluator,
            judges: self.judge_pool(),
            prompts: prompts.clone(),
            process_log: self.process_log.clone(),
            capability: ind.capability.clone(),
            indicator: ind.name.clone(),
            runs: s.case_execution_times,
        });

        let results: Vec<CaseResult> = CaseScheduler::new(s.max_concurrent_cases)
            .run_all(worker, cases.clone())
            .await?;

        let label = ind.label();
        let key = IndicatorKey {
            label: &label,
            evaluation_type: ind.evaluation_type,
        };
        for (case, result) in cases.iter().zip(&results) {
            let fp = prompts
                .target_prompt(&ind.capability, &ind.name, case)
                .ok()
                .map(|p| {
                    fingerprint::compute(fingerprint::Context {
                        suite: &self.config.suite,
                        target: self.target.name(),
                        indicator: &label,
                        case_id: &case.case_id,
                        prompt: &p,
                    })
                });
            self.store.insert_case_result(run_id, &key, result, fp.as_deref())?;
        }

        Ok(IndicatorReport::build(
            &ind.capability,
            &ind.name,
            ind.evaluation_type,
            &cases,
            &results,
        ))
    }
}
