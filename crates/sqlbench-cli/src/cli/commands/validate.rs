use sqlbench_core::config::load_config;
use sqlbench_core::dataset::load_cases;

use super::exit_codes;
use crate::cli::args::ValidateArgs;

pub fn run(args: ValidateArgs) -> anyhow::Result<i32> {
    let cfg = match load_config(&args.config, args.strict) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {}", e);
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };

    let mut ok = true;
    for ind in &cfg.indicators {
        match load_cases(&ind.dataset) {
            Ok(cases) if cases.is_empty() => {
                eprintln!("warn: {} has no cases ({})", ind.label(), ind.dataset.display());
            }
            Ok(cases) => {
                eprintln!("ok: {} ({}) {} cases", ind.label(), ind.evaluation_type, cases.len());
            }
            Err(e) => {
                eprintln!("error: {}: {:#}", ind.label(), e);
                ok = false;
            }
        }
    }

    if ok {
        eprintln!(
            "config ok: suite={} target={} judges={}",
            cfg.suite,
            cfg.target.display_name(),
            cfg.judges.len()
        );
        Ok(exit_codes::OK)
    } else {
        Ok(exit_codes::CONFIG_ERROR)
    }
}
