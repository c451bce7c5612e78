// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Query, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;

use contact_cell::{Contact, ContactIdentifier};
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    Appointment, AppointmentListQuery, AppointmentStatus, BookingRequest, CancelAppointmentRequest, ListFilter,
    ScheduleAppointmentRequest, UpdateAppointmentStatusRequest,
};
use crate::services::booking::AppointmentBookingService;
use crate::services::lifecycle::AppointmentLifecycleService;

#[derive(Clone)]
pub struct AppointmentState {
    pub lifecycle: Arc<AppointmentLifecycleService>,
    pub booking: Arc<AppointmentBookingService>,
}

// ==============================================================================
// ADMIN HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateAppointmentStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let identifier = ContactIdentifier::from_parts(request.contact_id.as_deref(), request.uuid.as_deref())?;

    let contact = state
        .lifecycle
        .set_status(&identifier, &request.status, request.notes.as_deref(), Utc::now())
        .await?;

    info!("User {} updated appointment status for contact {}", user.id, contact.id);

    Ok(Json(json!({
        "success": true,
        "appointment": Appointment::from(&contact),
        "contact": contact
    })))
}

#[axum::debug_handler]
pub async fn schedule_appointment(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    Json(request): Json<ScheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let identifier = ContactIdentifier::from_parts(request.contact_id.as_deref(), request.uuid.as_deref())?;

    let contact = state
        .lifecycle
        .schedule(&identifier, request.scheduled_at, request.time_zone.as_deref(), Utc::now())
        .await?;

    info!("User {} scheduled contact {}", user.id, contact.id);

    Ok(Json(json!({
        "success": true,
        "appointment": Appointment::from(&contact)
    })))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<AppointmentState>,
    Query(params): Query<AppointmentListQuery>,
) -> Result<Json<Value>, AppError> {
    let filter = ListFilter::try_from(params)?;
    let appointments = state.lifecycle.list_appointments(&filter, Utc::now()).await?;

    Ok(Json(json!({
        "success": true,
        "total": appointments.len(),
        "appointments": appointments
    })))
}

/// Operator cancel by any identifier form.
#[axum::debug_handler]
pub async fn admin_cancel_appointment(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let identifier = request.resolve_identifier()?;

    let contact = state
        .lifecycle
        .cancel(&identifier, request.reason.as_deref(), Utc::now())
        .await?;
    info!("Admin {} cancelled appointment for contact {}", user.id, contact.id);

    Ok(cancel_response(&contact))
}

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

/// Cancel link sent to clients.
#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<AppointmentState>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let identifier = request.resolve_link_token()?;

    let contact = state
        .lifecycle
        .cancel(&identifier, request.reason.as_deref(), Utc::now())
        .await?;

    Ok(cancel_response(&contact))
}

fn cancel_response(contact: &Contact) -> Json<Value> {
    let message = if contact.appointment_status == Some(AppointmentStatus::Cancelled) {
        "Your appointment has been cancelled"
    } else {
        "This appointment has already ended and can no longer be cancelled"
    };

    Json(json!({
        "success": true,
        "appointment": Appointment::from(contact),
        "message": message
    }))
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<AppointmentState>,
    Json(request): Json<BookingRequest>,
) -> Result<Json<Value>, AppError> {
    let outcome = state.booking.book(request, Utc::now()).await?;

    Ok(Json(json!({
        "success": true,
        "contact": {
            "id": outcome.contact.id,
            "uuid": outcome.contact.uuid,
        },
        "created": outcome.created,
        "appointment": outcome.appointment,
        "notification": outcome.notification
    })))
}
