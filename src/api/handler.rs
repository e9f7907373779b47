use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::api::models::{HealthResponse, SummaryResponse};
use crate::error::AppResult;
use crate::reconcile::ReconciliationOrchestrator;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ReconciliationOrchestrator>,
}

/// Reconcile every customer with open receipts
/// POST /reconciliation/run
pub async fn run_reconciliation(
    State(state): State<AppState>,
) -> AppResult<Json<SummaryResponse>> {
    info!("Reconciliation run requested");
    let summary = state.orchestrator.run().await?;
    Ok(Json(SummaryResponse::from(summary)))
}

/// Reconcile a single customer's receipts against their schedules
/// POST /reconciliation/customers/{name}/run
pub async fn run_customer_reconciliation(
    State(state): State<AppState>,
    Path(customer): Path<String>,
) -> AppResult<Json<SummaryResponse>> {
    info!("Reconciliation run requested for customer {}", customer);
    let summary = state.orchestrator.run_for_customer(&customer).await?;
    Ok(Json(SummaryResponse::from(summary)))
}

/// GET /health - Health check
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        reconciliation_running: state.orchestrator.is_running(),
    })
}
