pub mod retry;
pub mod scheduler;
pub mod target;
pub mod worker;

pub use retry::{call_with_retry, RetryPolicy};
pub use scheduler::CaseScheduler;
pub use target::{ApplicationTarget, LlmTarget, Target};
pub use worker::CaseWorker;
