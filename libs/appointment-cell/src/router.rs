// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::admin_auth_middleware;

use crate::handlers::{self, AppointmentState};

pub fn appointment_routes(config: Arc<AppConfig>, state: AppointmentState) -> Router {
    // Operator tooling
    let admin_routes = Router::new()
        .route("/", get(handlers::list_appointments))
        .route("/status", post(handlers::update_appointment_status))
        .route("/schedule", post(handlers::schedule_appointment))
        .route("/admin/cancel", post(handlers::admin_cancel_appointment))
        .layer(middleware::from_fn_with_state(config, admin_auth_middleware));

    // Links and forms used by clients
    let public_routes = Router::new()
        .route("/book", post(handlers::book_appointment))
        .route("/cancel", post(handlers::cancel_appointment));

    Router::new()
        .merge(admin_routes)
        .merge(public_routes)
        .with_state(state)
}
