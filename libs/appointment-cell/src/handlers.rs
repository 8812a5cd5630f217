// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{
    BlockSlotRequest, BookingError, CancelAppointmentRequest, CreateAppointmentRequest,
    ReconcileRequest, RescheduleAppointmentRequest, UpdateStatusRequest,
};
use crate::router::AppointmentState;
use crate::services::BookingCoordinator;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct ProviderAppointmentsQuery {
    pub date: NaiveDate,
}

fn map_booking_error(e: BookingError) -> AppError {
    match e {
        BookingError::Validation(msg) => AppError::ValidationError(msg),
        BookingError::NotFound(msg) => AppError::NotFound(msg),
        e @ BookingError::SlotUnavailable { .. } => AppError::Conflict(e.to_string()),
        e @ BookingError::InvalidTransition { .. } => AppError::Conflict(e.to_string()),
        e @ BookingError::RegistrationRequired { .. } => AppError::Unprocessable(e.to_string()),
        BookingError::Storage(e) => AppError::Unavailable(e.to_string()),
    }
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<AppointmentState>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let appointment = state
        .coordinator
        .create(request)
        .await
        .map_err(map_booking_error)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "appointment": appointment,
            "message": "Appointment booked"
        })),
    ))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .coordinator
        .get_appointment(appointment_id)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({ "appointment": appointment })))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .coordinator
        .reschedule(appointment_id, request)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment rescheduled"
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .coordinator
        .cancel(appointment_id, request)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment cancelled"
    })))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .coordinator
        .mark_status(appointment_id, request)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn get_provider_appointments(
    State(state): State<AppointmentState>,
    Path(provider_id): Path<Uuid>,
    Query(query): Query<ProviderAppointmentsQuery>,
) -> Result<Json<Value>, AppError> {
    let appointments = state
        .coordinator
        .list_for_provider(provider_id, query.date)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "provider_id": provider_id,
        "date": query.date,
        "total": appointments.len(),
        "appointments": appointments
    })))
}

#[axum::debug_handler]
pub async fn reconcile_provider(
    State(state): State<AppointmentState>,
    Json(request): Json<ReconcileRequest>,
) -> Result<Json<Value>, AppError> {
    let report = state
        .reconciler
        .run(request.provider_id, request.from, request.to)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "provider_id": request.provider_id,
        "report": report
    })))
}

// ==============================================================================
// SLOT HOLD HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn block_slot(
    State(coordinator): State<Arc<BookingCoordinator>>,
    Path(slot_id): Path<String>,
    request: Option<Json<BlockSlotRequest>>,
) -> Result<Json<Value>, AppError> {
    let reason = request.and_then(|Json(r)| r.reason);
    let slot = coordinator
        .block_slot(&slot_id, reason)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({ "success": true, "slot": slot })))
}

#[axum::debug_handler]
pub async fn unblock_slot(
    State(coordinator): State<Arc<BookingCoordinator>>,
    Path(slot_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let slot = coordinator
        .unblock_slot(&slot_id)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({ "success": true, "slot": slot })))
}
