// libs/conversation-cell/src/router.rs
use std::sync::Arc;

use axum::{routing::post, Router};

use crate::handlers;
use crate::services::engine::ConversationEngine;

pub fn conversation_routes(engine: Arc<ConversationEngine>) -> Router {
    Router::new()
        .route("/", post(handlers::conversation))
        .route("/sms", post(handlers::inbound_sms))
        .with_state(engine)
}
