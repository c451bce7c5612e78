// libs/workflow-cell/src/handlers.rs
use std::sync::Arc;

use axum::{extract::State, Json};
use axum_extra::typed_header::{TypedHeader, TypedHeaderRejection};
use chrono::Utc;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::warn;

use shared_models::error::AppError;
use shared_utils::jwt::secrets_match;

use crate::models::WorkflowError;
use crate::services::sweep::WorkflowSweepService;

#[derive(Clone)]
pub struct WorkflowState {
    pub sweep: Arc<WorkflowSweepService>,
    pub cron_secret: String,
}

/// Cron entry point. Per-contact failures are reported in the body, so the
/// response is 200 whenever the caller is authorized.
#[axum::debug_handler]
pub async fn run_sweep(
    State(state): State<WorkflowState>,
    auth: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
) -> Result<Json<Value>, AppError> {
    let authorized = match &auth {
        Ok(TypedHeader(Authorization(bearer))) => secrets_match(bearer.token(), &state.cron_secret),
        Err(_) => false,
    };
    if !authorized {
        warn!("Rejected workflow sweep with missing or invalid cron secret");
        return Err(WorkflowError::Unauthorized("Invalid cron secret".to_string()).into());
    }

    let report = state.sweep.run_sweep(Utc::now()).await;

    Ok(Json(json!({
        "success": true,
        "totalProcessed": report.total_processed,
        "breakdown": report.breakdown,
        "errors": report.errors,
        "processingTimeMs": report.processing_time_ms
    })))
}
