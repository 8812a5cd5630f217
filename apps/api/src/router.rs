use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::{appointment_routes, slot_hold_routes, AppointmentState};
use schedule_cell::router::schedule_routes;
use slot_cell::router::slot_routes;

use crate::state::AppServices;

pub fn create_router(services: AppServices) -> Router {
    let appointments = appointment_routes(AppointmentState {
        coordinator: services.coordinator.clone(),
        reconciler: services.reconciler.clone(),
    });
    let slots = slot_routes(services.registry.clone())
        .merge(slot_hold_routes(services.coordinator.clone()));

    Router::new()
        .route("/", get(|| async { "Booking API is running!" }))
        .nest("/schedules", schedule_routes(services.schedules.clone()))
        .nest("/slots", slots)
        .nest("/appointments", appointments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::io::Write;

    use serde_json::{json, Value};
    use chrono::Utc;
    use shared_config::AppConfig;
    use tempfile::NamedTempFile;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn app() -> Router {
        create_router(AppServices::from_config(&AppConfig::default()).unwrap())
    }

    fn every_day_nine_to_ten() -> Value {
        let days: Vec<Value> = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]
            .iter()
            .map(|day| json!({ "weekday": day, "windows": [{ "start": "09:00:00", "end": "10:00:00" }] }))
            .collect();
        json!({ "slot_duration_minutes": 20, "days": days })
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn template_edit_materialises_slots() {
        let app = app();
        let provider_id = Uuid::new_v4();

        let (status, _) = send(
            &app,
            "PUT",
            &format!("/schedules/{}/template", provider_id),
            Some(every_day_nine_to_ten()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let today = Utc::now().date_naive();
        let (status, slots) = send(
            &app,
            "GET",
            &format!("/slots/providers/{}?date={}", provider_id, today),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(slots["total_slots"], 3);

        let slot_id = slots["slots"][0]["id"].as_str().unwrap().to_string();
        let (status, blocked) = send(&app, "POST", &format!("/slots/{}/block", slot_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(blocked["slot"]["status"], "blocked");
    }

    #[tokio::test]
    async fn booking_without_schedule_is_conflict() {
        let app = app();
        let provider_id = Uuid::new_v4();
        let (status, _) = send(
            &app,
            "POST",
            "/appointments",
            Some(json!({
                "provider_id": provider_id,
                "patient_id": Uuid::new_v4(),
                "date": "2030-01-07",
                "time_range": { "start": "09:00:00", "end": "09:30:00" },
                "modified_by": "test"
            })),
        )
        .await;

        // No schedule, so no slot to claim.
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn seeded_patient_can_book() {
        let patient_id = Uuid::new_v4();
        let mut seed = NamedTempFile::new().unwrap();
        write!(
            seed,
            "{}",
            json!([{
                "id": patient_id,
                "first_name": "Aoife",
                "last_name": "Byrne",
                "email": "aoife@example.com",
                "phone_number": null
            }])
        )
        .unwrap();
        let config = AppConfig {
            patient_seed_file: Some(seed.path().to_string_lossy().into_owned()),
            ..AppConfig::default()
        };
        let app = create_router(AppServices::from_config(&config).unwrap());
        let provider_id = Uuid::new_v4();

        let (status, _) = send(
            &app,
            "PUT",
            &format!("/schedules/{}/template", provider_id),
            Some(every_day_nine_to_ten()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, created) = send(
            &app,
            "POST",
            "/appointments",
            Some(json!({
                "provider_id": provider_id,
                "patient_id": patient_id,
                "date": Utc::now().date_naive(),
                "time_range": { "start": "09:00:00", "end": "09:20:00" },
                "modified_by": "web"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["appointment"]["status"], "confirmed");
    }

    #[test]
    fn unreadable_seed_file_fails_startup() {
        let config = AppConfig {
            patient_seed_file: Some("/nonexistent/patients.json".to_string()),
            ..AppConfig::default()
        };

        assert!(AppServices::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn oversized_regeneration_is_bad_request() {
        let app = app();
        let provider_id = Uuid::new_v4();

        let (status, body) = send(
            &app,
            "POST",
            &format!("/slots/providers/{}/regenerate", provider_id),
            Some(json!({ "start_date": "2025-06-16", "days": 4_000_000_000u32 })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }
}
