use sqlbench_core::bench::BenchRunner;
use sqlbench_core::config::load_config;
use sqlbench_core::process_log::FileProcessLog;
use sqlbench_core::report::{console, json};
use sqlbench_core::storage::Store;
use std::path::Path;
use std::sync::Arc;

use super::exit_codes;
use crate::cli::args::RunArgs;

pub async fn run(args: RunArgs) -> anyhow::Result<i32> {
    tracing::debug!(config = %args.config.display(), db = %args.db.display(), "starting run");
    let cfg = match load_config(&args.config, args.strict) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("config error: {}", e);
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };

    ensure_parent(&args.db)?;
    let store = Store::open(&args.db)?;
    store.init_schema()?;
    let process_log = Arc::new(FileProcessLog::new(&args.process_log));

    let runner = match BenchRunner::from_config(
        cfg,
        store,
        process_log,
        sqlbench_metrics::default_evaluators(),
    ) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("config error: {}", e);
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };

    let report = runner.run(args.only.as_deref()).await?;
    if report.indicators.is_empty() && report.skipped.is_empty() {
        eprintln!("no indicator was run");
        return Ok(exit_codes::CONFIG_ERROR);
    }

    console::print_summary(&report);
    json::write_json(&report, &args.out)?;
    tracing::info!(run_id = report.run_id, out = %args.out.display(), "report written");
    eprintln!("Report: {}", args.out.display());
    eprintln!("Process log: {}", args.process_log.display());

    if report.any_failed() {
        Ok(exit_codes::TEST_FAILED)
    } else {
        Ok(exit_codes::OK)
    }
}

fn ensure_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
