use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};

use shared_config::AppConfig;

use crate::handlers;

pub fn scheduling_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        // Slot generation flow
        .route(
            "/doctors/{doctor_id}/slots/preview",
            post(handlers::preview_slot_generation),
        )
        .route(
            "/doctors/{doctor_id}/slots/generate",
            post(handlers::generate_slots),
        )
        .route(
            "/doctors/{doctor_id}/slots/weekends",
            get(handlers::list_weekends),
        )
        // Blocked slots and type configuration
        .route(
            "/doctors/{doctor_id}/blocked-slots",
            post(handlers::add_blocked_slot),
        )
        .route(
            "/doctors/{doctor_id}/appointment-types",
            put(handlers::update_appointment_types),
        )
        .with_state(state)
}
