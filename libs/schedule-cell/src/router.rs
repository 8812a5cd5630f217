use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put, delete},
};

use crate::handlers;
use crate::services::ScheduleService;

pub fn schedule_routes(service: Arc<ScheduleService>) -> Router {
    Router::new()
        .route("/{provider_id}", get(handlers::get_schedule))
        .route("/{provider_id}/template", put(handlers::set_weekly_template))
        .route("/{provider_id}/overrides/{date}", put(handlers::set_date_override))
        .route("/{provider_id}/overrides/{date}", delete(handlers::remove_date_override))
        .route("/{provider_id}/leave", post(handlers::add_leave))
        .route("/{provider_id}/leave/{leave_id}", delete(handlers::remove_leave))
        .with_state(service)
}
