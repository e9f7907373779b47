use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, info};

use crate::error::{AppResult, ReconcileError};

pub type Job = BoxFuture<'static, ()>;

/// Bounded worker pool for batch jobs.
///
/// `core` resident workers drain a bounded queue. When the queue is full,
/// a job may still start on a burst worker until `max` jobs are in flight;
/// past that the submitting task runs the job itself, so submission applies
/// backpressure and no job is ever dropped.
pub struct WorkerPool {
    queue: mpsc::Sender<Job>,
    burst: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(core: usize, max: usize, queue_capacity: usize) -> Self {
        let core = core.max(1);
        let max = max.max(core);
        let (queue, receiver) = mpsc::channel::<Job>(queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));

        for worker_id in 0..core {
            let receiver = Arc::clone(&receiver);
            tokio::spawn(async move {
                loop {
                    // Hold the lock only while picking up the next job
                    let job = { receiver.lock().await.recv().await };
                    match job {
                        Some(job) => job.await,
                        None => break,
                    }
                }
                debug!("Worker {} stopped", worker_id);
            });
        }

        info!(
            "Worker pool started: {} core workers, {} max, queue capacity {}",
            core,
            max,
            queue_capacity.max(1)
        );

        Self {
            queue,
            burst: Arc::new(Semaphore::new(max - core)),
        }
    }

    /// Submit a job. Returns once the job is queued, handed to a burst
    /// worker, or (when the pool is saturated) finished inline.
    pub async fn submit(&self, job: Job) -> AppResult<()> {
        match self.queue.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(job)) => {
                match Arc::clone(&self.burst).try_acquire_owned() {
                    Ok(permit) => {
                        tokio::spawn(async move {
                            job.await;
                            drop(permit);
                        });
                        Ok(())
                    }
                    Err(_) => {
                        // Queue and burst capacity exhausted: caller runs
                        debug!("Worker pool saturated, running job on the submitting task");
                        job.await;
                        Ok(())
                    }
                }
            }
            Err(TrySendError::Closed(_)) => Err(ReconcileError::PoolClosed.into()),
        }
    }
}
