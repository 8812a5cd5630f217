use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use schedule_cell::models::ScheduleError;
use shared_models::error::AppError;

use crate::models::{RegenerateRequest, SlotError, SlotView};
use crate::services::SlotRegistry;

#[derive(Debug, Deserialize)]
pub struct SlotQuery {
    pub date: NaiveDate,
    pub include_unavailable: Option<bool>,
}

fn map_slot_error(e: SlotError) -> AppError {
    match e {
        SlotError::Schedule(ScheduleError::Validation(msg)) => AppError::ValidationError(msg),
        SlotError::Schedule(ScheduleError::NotFound(msg)) => AppError::NotFound(msg),
        SlotError::Schedule(ScheduleError::Conflict(msg)) => AppError::Conflict(msg),
        SlotError::Schedule(ScheduleError::Storage(e)) | SlotError::Storage(e) => {
            AppError::Unavailable(e.to_string())
        }
    }
}

#[axum::debug_handler]
pub async fn get_provider_slots(
    State(registry): State<Arc<SlotRegistry>>,
    Path(provider_id): Path<Uuid>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Value>, AppError> {
    let slots: Vec<SlotView> = if query.include_unavailable.unwrap_or(false) {
        registry
            .slots_for_date(provider_id, query.date)
            .await
            .map_err(map_slot_error)?
            .iter()
            .map(|slot| slot.view())
            .collect()
    } else {
        registry
            .available_slots(provider_id, query.date)
            .await
            .map_err(map_slot_error)?
    };

    Ok(Json(json!({
        "provider_id": provider_id,
        "date": query.date,
        "total_slots": slots.len(),
        "slots": slots
    })))
}

#[axum::debug_handler]
pub async fn regenerate_provider_slots(
    State(registry): State<Arc<SlotRegistry>>,
    Path(provider_id): Path<Uuid>,
    request: Option<Json<RegenerateRequest>>,
) -> Result<Json<Value>, AppError> {
    let request = request.map(|Json(r)| r);
    let start = request
        .as_ref()
        .and_then(|r| r.start_date)
        .unwrap_or_else(|| Utc::now().date_naive());
    let days = request
        .as_ref()
        .and_then(|r| r.days)
        .unwrap_or_else(|| registry.horizon_days());

    let report = registry
        .regenerate_range(provider_id, start, days)
        .await
        .map_err(map_slot_error)?;

    Ok(Json(json!({
        "success": true,
        "provider_id": provider_id,
        "start_date": start,
        "days": days,
        "report": report
    })))
}
