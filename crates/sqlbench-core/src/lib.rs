pub mod bench;
pub mod config;
pub mod consensus;
pub mod dataset;
pub mod engine;
pub mod errors;
pub mod evaluator;
pub mod fingerprint;
pub mod judge;
pub mod model;
pub mod process_log;
pub mod prompt;
pub mod providers;
pub mod report;
pub mod storage;
