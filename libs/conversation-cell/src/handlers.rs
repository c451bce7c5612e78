// libs/conversation-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Form, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;

use contact_cell::ContactIdentifier;
use shared_models::error::AppError;

use crate::models::{ConversationRequest, InboundSms};
use crate::services::engine::ConversationEngine;

/// Reads the conversation state, or records an answer and returns the new
/// state when `questionId` and `response` are present.
#[axum::debug_handler]
pub async fn conversation(
    State(engine): State<Arc<ConversationEngine>>,
    Json(request): Json<ConversationRequest>,
) -> Result<Json<Value>, AppError> {
    let identifier = ContactIdentifier::from_parts(request.contact_id.as_deref(), request.uuid.as_deref())?;

    let state = match request.answer()? {
        Some(input) => engine.record_response(&identifier, input, Utc::now()).await?,
        None => engine.get_state(&identifier).await?,
    };

    Ok(Json(json!({
        "success": true,
        "conversationState": state
    })))
}

/// Twilio inbound-message webhook. Always answers with TwiML so Twilio
/// relays the reply to the sender.
#[axum::debug_handler]
pub async fn inbound_sms(
    State(engine): State<Arc<ConversationEngine>>,
    Form(message): Form<InboundSms>,
) -> Result<impl IntoResponse, AppError> {
    let reply = engine.handle_inbound_sms(&message.from, &message.body, Utc::now()).await?;

    if let Some(contact_id) = &reply.contact_id {
        info!("Replied to inbound SMS from contact {}", contact_id);
    }

    Ok(([(header::CONTENT_TYPE, "text/xml")], twiml_message(&reply.message)))
}

pub fn twiml_message(text: &str) -> String {
    let escaped = text
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;");
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>{}</Message></Response>",
        escaped
    )
}
