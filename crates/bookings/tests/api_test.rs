use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

use helpdesk_bookings::{MockBookingBackend, router};

fn app(business_id: Option<&str>) -> (Arc<MockBookingBackend>, Router) {
    let backend = Arc::new(MockBookingBackend::new(business_id.map(String::from)));
    (backend.clone(), router(backend))
}

async fn post(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_availability_returns_day_schedule() {
    let (_, app) = app(Some("contoso"));
    let (status, body) = post(
        app,
        "/api/bookings/availability",
        json!({ "date": "2026-03-02", "serviceType": "hardware-repair" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["date"], "2026-03-02");
    assert_eq!(body["serviceType"], "hardware-repair");
    assert_eq!(body["slots"].as_array().unwrap().len(), 5);
    assert_eq!(
        body["slots"][2],
        json!({ "start": "11:00 AM", "end": "12:00 PM", "available": false })
    );
}

#[tokio::test]
async fn test_validation_runs_before_configuration_check() {
    let (_, unconfigured) = app(None);
    let (status, body) = post(unconfigured.clone(), "/api/bookings/availability", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Date is required" }));

    let (status, body) = post(
        unconfigured.clone(),
        "/api/bookings/create",
        json!({ "customerName": "Asha", "customerEmail": "asha@example.com" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Missing required fields" }));

    let (status, body) = post(
        unconfigured,
        "/api/bookings/availability",
        json!({ "date": "2026-03-02" }),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Microsoft Bookings not configured" }));
}

#[tokio::test]
async fn test_create_returns_confirmation() {
    let (backend, app) = app(Some("contoso"));
    let (status, body) = post(
        app,
        "/api/bookings/create",
        json!({
            "customerName": "Asha",
            "customerEmail": "asha@example.com",
            "customerPhone": "+1 555 0100",
            "serviceId": "hardware-repair",
            "startDateTime": "2026-03-02T09:00:00",
            "endDateTime": "2026-03-02T09:30:00",
            "notes": "Laptop fan is grinding"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Appointment successfully scheduled");
    assert!(body["bookingId"].as_str().unwrap().starts_with("BOOKING-"));
    assert_eq!(body["appointment"]["id"], body["bookingId"]);
    assert_eq!(body["appointment"]["endDateTime"], "2026-03-02T09:30:00");
    assert_eq!(backend.bookings().len(), 1);
}

#[tokio::test]
async fn test_webhook_dispatch() {
    let (_, app) = app(Some("contoso"));

    let (status, body) = post(app.clone(), "/api/vapi/webhook", json!({ "type": "status-update", "status": "in-progress" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let (status, body) = post(
        app.clone(),
        "/api/vapi/webhook",
        json!({
            "type": "function-call",
            "functionCall": {
                "name": "check_availability",
                "parameters": { "date": "2026-03-02", "serviceType": "onboarding" }
            }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["date"], "2026-03-02");
    let slots = body["result"]["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 4);
    assert!(slots.iter().all(|slot| slot["available"] == true));

    let (status, body) = post(
        app.clone(),
        "/api/vapi/webhook",
        json!({ "type": "function-call", "functionCall": { "name": "reboot_server" } }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Unknown function" }));

    let (status, body) = post(app, "/api/vapi/webhook", json!({ "type": "function-call" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "No function call data" }));
}
