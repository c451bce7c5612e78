// libs/contact-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{ContactIdentifier, ContactStatus, LeadForm};
use crate::services::contact::ContactService;

#[derive(Debug, Deserialize)]
pub struct ContactStatusRequest {
    pub status: String,
}

/// Public contact form.
#[axum::debug_handler]
pub async fn submit_contact_form(
    State(service): State<Arc<ContactService>>,
    Json(form): Json<LeadForm>,
) -> Result<Json<Value>, AppError> {
    let outcome = service.capture_lead(form).await?;

    Ok(Json(json!({
        "success": true,
        "contact": {
            "id": outcome.contact.id,
            "uuid": outcome.contact.uuid,
        },
        "created": outcome.created,
        "message": "Thanks for reaching out - we'll be in touch shortly"
    })))
}

#[axum::debug_handler]
pub async fn get_contact(
    State(service): State<Arc<ContactService>>,
    Path(identifier): Path<String>,
) -> Result<Json<Value>, AppError> {
    let identifier = ContactIdentifier::parse(&identifier)?;
    let contact = service.find_by_identifier(&identifier).await?;

    Ok(Json(json!({
        "success": true,
        "contact": contact
    })))
}

#[axum::debug_handler]
pub async fn set_contact_status(
    State(service): State<Arc<ContactService>>,
    Extension(user): Extension<User>,
    Path(identifier): Path<String>,
    Json(request): Json<ContactStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let identifier = ContactIdentifier::parse(&identifier)?;
    let status: ContactStatus = request.status.parse()?;

    let contact = service.set_contact_status(&identifier, status).await?;
    info!("User {} set contact {} to {}", user.id, contact.id, status);

    Ok(Json(json!({
        "success": true,
        "contact": contact
    })))
}
