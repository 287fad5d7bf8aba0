use std::path::Path;

use super::exit_codes;
use crate::cli::args::InitArgs;
use crate::templates;

pub fn run(args: InitArgs) -> anyhow::Result<i32> {
    let base = args.config.parent().unwrap_or(Path::new("."));
    let files = [
        (args.config.clone(), templates::BENCH_YAML),
        (base.join("prompts/understanding.txt"), templates::TARGET_PROMPT),
        (base.join("prompts/judge.txt"), templates::JUDGE_PROMPT),
        (base.join("datasets/understanding.jsonl"), templates::SAMPLE_DATASET),
    ];

    for (path, content) in files {
        if path.exists() && !args.force {
            eprintln!("skip: {} exists", path.display());
            continue;
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&path, content)?;
        eprintln!("created {}", path.display());
    }
    Ok(exit_codes::OK)
}
