// libs/workflow-cell/src/router.rs
use axum::{routing::post, Router};

use crate::handlers::{self, WorkflowState};

pub fn workflow_routes(state: WorkflowState) -> Router {
    Router::new()
        .route("/sweep", post(handlers::run_sweep))
        .with_state(state)
}
