use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{CreateLeaveRequest, ScheduleError, SetDateOverrideRequest, WeeklyTemplate};
use crate::services::ScheduleService;

fn map_schedule_error(e: ScheduleError) -> AppError {
    match e {
        ScheduleError::Validation(msg) => AppError::ValidationError(msg),
        ScheduleError::NotFound(msg) => AppError::NotFound(msg),
        ScheduleError::Conflict(msg) => AppError::Conflict(msg),
        ScheduleError::Storage(e) => AppError::Unavailable(e.to_string()),
    }
}

#[axum::debug_handler]
pub async fn get_schedule(
    State(service): State<Arc<ScheduleService>>,
    Path(provider_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let schedule = service.get_schedule(provider_id).await.map_err(map_schedule_error)?;

    Ok(Json(json!({ "schedule": schedule })))
}

#[axum::debug_handler]
pub async fn set_weekly_template(
    State(service): State<Arc<ScheduleService>>,
    Path(provider_id): Path<Uuid>,
    Json(template): Json<WeeklyTemplate>,
) -> Result<Json<Value>, AppError> {
    let schedule = service
        .set_weekly_template(provider_id, template)
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "success": true,
        "schedule": schedule
    })))
}

#[axum::debug_handler]
pub async fn set_date_override(
    State(service): State<Arc<ScheduleService>>,
    Path((provider_id, date)): Path<(Uuid, NaiveDate)>,
    Json(request): Json<SetDateOverrideRequest>,
) -> Result<Json<Value>, AppError> {
    let schedule = service
        .set_date_override(provider_id, date, request)
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "success": true,
        "schedule": schedule
    })))
}

#[axum::debug_handler]
pub async fn remove_date_override(
    State(service): State<Arc<ScheduleService>>,
    Path((provider_id, date)): Path<(Uuid, NaiveDate)>,
) -> Result<Json<Value>, AppError> {
    let schedule = service
        .remove_date_override(provider_id, date)
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "success": true,
        "schedule": schedule
    })))
}

#[axum::debug_handler]
pub async fn add_leave(
    State(service): State<Arc<ScheduleService>>,
    Path(provider_id): Path<Uuid>,
    Json(request): Json<CreateLeaveRequest>,
) -> Result<Json<Value>, AppError> {
    let (leave, schedule) = service
        .add_leave(provider_id, request)
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "success": true,
        "leave": leave,
        "schedule": schedule
    })))
}

#[axum::debug_handler]
pub async fn remove_leave(
    State(service): State<Arc<ScheduleService>>,
    Path((provider_id, leave_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, AppError> {
    let schedule = service
        .remove_leave(provider_id, leave_id)
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "success": true,
        "schedule": schedule
    })))
}
