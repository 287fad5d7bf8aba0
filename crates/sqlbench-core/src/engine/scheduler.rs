use super::worker::CaseWorker;
use crate::model::{CaseResult, RunAttempt, TestCase};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Dispatches the cases of one indicator file to a bounded pool of workers.
#[derive(Debug, Clone, Copy)]
pub struct CaseScheduler {
    pub max_concurrent: usize,
}

impl CaseScheduler {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Results come back in input order whatever the completion order.
    /// A panicked worker still fills its slot with a failed result carrying
    /// one failed attempt per run.
    pub async fn run_all(&self, worker: Arc<CaseWorker>, cases: Vec<TestCase>) -> anyhow::Result<Vec<CaseResult>> {
        let runs = worker.runs.max(1);
        let sem = Arc::new(Semaphore::new(self.max_concurrent));
        let mut handles = Vec::with_capacity(cases.len());

        for (idx, case) in cases.into_iter().enumerate() {
            let permit = sem.clone().acquire_owned().await?;
            let worker = worker.clone();
            let case_id = case.case_id.clone();
            let h = tokio::spawn(async move {
                let _permit = permit;
                worker.process_case(&case, idx).await
            });
            handles.push((idx, case_id, h));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (idx, case_id, h) in handles {
            let row = match h.await {
                Ok(r) => r,
                Err(e) => {
                    tracing::error!(case_id = %case_id, error = %e, "case task join error");
                    let msg = format!("join error: {}", e);
                    let attempts = (0..runs).map(|i| RunAttempt::failed(i, &msg)).collect();
                    CaseResult::failed(case_id, idx, attempts, msg)
                }
            };
            results.push(row);
        }
        Ok(results)
    }
}
