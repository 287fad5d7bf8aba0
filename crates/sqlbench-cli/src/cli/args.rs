use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "sqlbench",
    version,
    about = "Benchmark runner for SQL-capable models and SQL applications"
)]
pub struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true, default_value_t = false)]
    pub log_json: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run every indicator of a bench config
    Run(RunArgs),
    /// Check a bench config and its datasets without calling any model
    Validate(ValidateArgs),
    /// Write a sample bench config, prompts and dataset
    Init(InitArgs),
    Version,
}

#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    #[arg(long, default_value = "bench.yaml")]
    pub config: PathBuf,

    #[arg(long, default_value = ".sqlbench/results.db")]
    pub db: PathBuf,

    /// JSON run report
    #[arg(long, default_value = "sqlbench-report.json")]
    pub out: PathBuf,

    /// Audit log of every prompt, answer and judge reply
    #[arg(long, default_value = ".sqlbench/process.log")]
    pub process_log: PathBuf,

    /// Reject unknown config fields
    #[arg(long, default_value_t = false)]
    pub strict: bool,

    /// Only run indicators of this capability
    #[arg(long)]
    pub only: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ValidateArgs {
    #[arg(long, default_value = "bench.yaml")]
    pub config: PathBuf,

    #[arg(long, default_value_t = false)]
    pub strict: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct InitArgs {
    #[arg(long, default_value = "bench.yaml")]
    pub config: PathBuf,

    /// Overwrite existing files
    #[arg(long, default_value_t = false)]
    pub force: bool,
}
