use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use futures::FutureExt;
use tokio::sync::oneshot;
use tracing::{error, info};

use crate::error::{AppResult, ReconcileError};
use crate::ledger::models::OPEN_STATUSES;
use crate::ledger::store::LedgerStore;
use super::batch::BatchProcessor;
use super::types::{BatchFailure, ReconciliationSummary};
use super::worker_pool::WorkerPool;

/// Entry point for reconciliation runs. Exactly one run can be in flight;
/// batches execute concurrently on the worker pool and one batch failing
/// never stops the others.
pub struct ReconciliationOrchestrator {
    store: Arc<dyn LedgerStore>,
    processor: Arc<BatchProcessor>,
    pool: Arc<WorkerPool>,
    batch_size: usize,
    running: AtomicBool,
}

impl ReconciliationOrchestrator {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        processor: Arc<BatchProcessor>,
        pool: Arc<WorkerPool>,
        batch_size: usize,
    ) -> Self {
        Self {
            store,
            processor,
            pool,
            batch_size,
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Run a full reconciliation pass over every candidate payer.
    pub async fn run(&self) -> AppResult<ReconciliationSummary> {
        let _guard = RunGuard::try_acquire(&self.running)?;
        let started = Instant::now();

        let candidates = self.store.find_candidate_payers(&OPEN_STATUSES).await?;
        if candidates.is_empty() {
            info!("Reconciliation run found no candidate payers");
            return Ok(ReconciliationSummary::default());
        }

        let customer_count = candidates.len();
        let batches = partition_customers(candidates, self.batch_size);
        info!(
            "Reconciliation run started: {} customers in {} batches",
            customer_count,
            batches.len()
        );

        let mut pending = Vec::with_capacity(batches.len());
        for (batch_index, batch) in batches.into_iter().enumerate() {
            let (result_tx, result_rx) = oneshot::channel();
            let processor = Arc::clone(&self.processor);
            let batch_customers = batch.len();
            let job = async move {
                let result = processor.process(&batch).await;
                let _ = result_tx.send(result);
            }
            .boxed();

            self.pool.submit(job).await?;
            pending.push((batch_index, batch_customers, result_rx));
        }

        let mut summary = ReconciliationSummary::default();
        let outcomes = join_all(
            pending
                .into_iter()
                .map(|(index, count, rx)| async move { (index, count, rx.await) }),
        )
        .await;

        for (batch_index, batch_customers, outcome) in outcomes {
            match outcome {
                Ok(Ok(result)) => summary.absorb(&result),
                Ok(Err(err)) => {
                    error!(
                        "Batch {} ({} customers) failed and was rolled back: {}",
                        batch_index, batch_customers, err
                    );
                    summary.failed_batches.push(BatchFailure {
                        batch_index,
                        customer_count: batch_customers,
                        error: err.to_string(),
                    });
                }
                Err(_) => {
                    let err = ReconcileError::ResultChannelClosed;
                    error!("Batch {} ({} customers): {}", batch_index, batch_customers, err);
                    summary.failed_batches.push(BatchFailure {
                        batch_index,
                        customer_count: batch_customers,
                        error: err.to_string(),
                    });
                }
            }
        }

        summary.total_time_seconds = started.elapsed().as_secs_f64();
        info!(
            "Reconciliation run finished in {:.3}s: verified {}, principal {}, interest {}, failed batches {}",
            summary.total_time_seconds,
            summary.total_verified_count,
            summary.total_principal,
            summary.total_interest,
            summary.failed_batches.len()
        );
        Ok(summary)
    }

    /// Reconcile a single customer. Takes the same single-flight guard as
    /// a full run so the two can never overlap on the same receipts.
    pub async fn run_for_customer(&self, customer: &str) -> AppResult<ReconciliationSummary> {
        let _guard = RunGuard::try_acquire(&self.running)?;
        let started = Instant::now();
        info!("Single-customer reconciliation for {}", customer);

        let result = self.processor.process(&[customer.to_string()]).await?;

        let mut summary = ReconciliationSummary::default();
        summary.absorb(&result);
        summary.total_time_seconds = started.elapsed().as_secs_f64();
        Ok(summary)
    }
}

/// Holds the single-flight flag; releases it on every exit path.
struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Result<Self, ReconcileError> {
        match flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => Ok(Self { flag }),
            Err(_) => Err(ReconcileError::AlreadyRunning),
        }
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Split customers into batches. A size of zero or one covering the whole
/// population degenerates to a single batch.
fn partition_customers(customers: Vec<String>, batch_size: usize) -> Vec<Vec<String>> {
    if customers.is_empty() {
        return Vec::new();
    }
    if batch_size == 0 || batch_size >= customers.len() {
        return vec![customers];
    }
    customers
        .chunks(batch_size)
        .map(|chunk| chunk.to_vec())
        .collect()
}
