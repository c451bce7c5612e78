// libs/contact-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::admin_auth_middleware;

use crate::handlers;
use crate::services::contact::ContactService;

pub fn contact_routes(config: Arc<AppConfig>, service: Arc<ContactService>) -> Router {
    let admin_routes = Router::new()
        .route("/{identifier}", get(handlers::get_contact))
        .route("/{identifier}/status", patch(handlers::set_contact_status))
        .layer(middleware::from_fn_with_state(config, admin_auth_middleware));

    Router::new()
        .route("/", post(handlers::submit_contact_form))
        .merge(admin_routes)
        .with_state(service)
}
