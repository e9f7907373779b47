// Receipt-to-schedule reconciliation engine
pub mod allocator;
pub mod batch;
pub mod orchestrator;
pub mod types;
pub mod worker_pool;

pub use batch::BatchProcessor;
pub use orchestrator::ReconciliationOrchestrator;
pub use types::ReconciliationSummary;
pub use worker_pool::WorkerPool;
