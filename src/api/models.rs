use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::reconcile::types::ReconciliationSummary;

// ========== RESPONSE MODELS ==========

/// Outcome of a reconciliation run
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub total_time_seconds: f64,
    pub total_verified_count: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_principal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_interest: Decimal,
    pub failed_batches: Vec<FailedBatchResponse>,
}

/// One customer batch that failed and rolled back
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedBatchResponse {
    pub batch_index: usize,
    pub customer_count: usize,
    pub error: String,
}

impl From<ReconciliationSummary> for SummaryResponse {
    fn from(summary: ReconciliationSummary) -> Self {
        Self {
            total_time_seconds: summary.total_time_seconds,
            total_verified_count: summary.total_verified_count,
            total_principal: summary.total_principal,
            total_interest: summary.total_interest,
            failed_batches: summary
                .failed_batches
                .into_iter()
                .map(|failure| FailedBatchResponse {
                    batch_index: failure.batch_index,
                    customer_count: failure.customer_count,
                    error: failure.error,
                })
                .collect(),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub reconciliation_running: bool,
}
