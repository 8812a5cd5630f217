// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, patch},
};

use crate::handlers;
use crate::services::{BookingCoordinator, Reconciler};

#[derive(Clone)]
pub struct AppointmentState {
    pub coordinator: Arc<BookingCoordinator>,
    pub reconciler: Arc<Reconciler>,
}

pub fn appointment_routes(state: AppointmentState) -> Router {
    Router::new()
        .route("/", post(handlers::create_appointment))
        .route("/reconcile", post(handlers::reconcile_provider))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/reschedule", patch(handlers::reschedule_appointment))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/{appointment_id}/status", patch(handlers::update_appointment_status))
        .route("/providers/{provider_id}", get(handlers::get_provider_appointments))
        .with_state(state)
}

/// Administrative holds; merged into the `/slots` tree by the API.
pub fn slot_hold_routes(coordinator: Arc<BookingCoordinator>) -> Router {
    Router::new()
        .route("/{slot_id}/block", post(handlers::block_slot))
        .route("/{slot_id}/unblock", post(handlers::unblock_slot))
        .with_state(coordinator)
}
