use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::handlers;
use crate::services::SlotRegistry;

pub fn slot_routes(registry: Arc<SlotRegistry>) -> Router {
    Router::new()
        .route("/providers/{provider_id}", get(handlers::get_provider_slots))
        .route("/providers/{provider_id}/regenerate", post(handlers::regenerate_provider_slots))
        .with_state(registry)
}
