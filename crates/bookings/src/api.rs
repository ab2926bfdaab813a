//! HTTP surface for the booking boundary

use axum::{
    Json, Router,
    extract::State,
    routing::post,
};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

use crate::backend::BookingBackend;
use crate::config::BookingsConfig;
use crate::error::{BookingError, BookingResult};
use crate::types::{AvailabilityRequest, AvailabilityResponse, BookingAppointment, BookingConfirmation};
use crate::webhook::{self, WebhookEvent};

/// Shared handler state
#[derive(Clone)]
pub struct BookingsState {
    backend: Arc<dyn BookingBackend>,
}

impl BookingsState {
    pub fn new(backend: Arc<dyn BookingBackend>) -> Self {
        Self { backend }
    }
}

/// Build the booking router
pub fn router(backend: Arc<dyn BookingBackend>) -> Router {
    Router::new()
        .route("/api/bookings/availability", post(availability_handler))
        .route("/api/bookings/create", post(create_handler))
        .route("/api/vapi/webhook", post(webhook_handler))
        .with_state(BookingsState::new(backend))
}

/// Serve the router on the configured address until `shutdown` resolves
pub async fn serve<F>(
    config: &BookingsConfig,
    backend: Arc<dyn BookingBackend>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if !config.is_configured() {
        warn!("No booking business configured; booking requests will fail");
    }

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Booking API listening on {}", listener.local_addr()?);

    axum::serve(listener, router(backend))
        .with_graceful_shutdown(shutdown)
        .await
}

fn log_rejection<T>(route: &str, result: BookingResult<T>) -> BookingResult<T> {
    if let Err(e) = &result {
        warn!("{} rejected: {}", route, e);
    }
    result
}

/// Handler for `POST /api/bookings/availability`.
pub async fn availability_handler(
    State(state): State<BookingsState>,
    Json(request): Json<AvailabilityRequest>,
) -> Result<Json<AvailabilityResponse>, BookingError> {
    let slots = match request.validate() {
        Ok(()) => state.backend.check_availability(&request).await,
        Err(e) => Err(e),
    };

    log_rejection("availability", slots).map(|slots| {
        Json(AvailabilityResponse {
            success: true,
            date: request.date,
            service_type: request.service_type,
            slots,
        })
    })
}

/// Handler for `POST /api/bookings/create`.
pub async fn create_handler(
    State(state): State<BookingsState>,
    Json(appointment): Json<BookingAppointment>,
) -> Result<Json<BookingConfirmation>, BookingError> {
    let result = match appointment.validate() {
        Ok(()) => state.backend.create_appointment(&appointment).await,
        Err(e) => Err(e),
    };

    log_rejection("create", result).map(Json)
}

/// Handler for `POST /api/vapi/webhook`.
pub async fn webhook_handler(
    State(state): State<BookingsState>,
    Json(event): Json<WebhookEvent>,
) -> Result<Json<Value>, BookingError> {
    let result = webhook::handle_event(state.backend.as_ref(), event).await;
    log_rejection("webhook", result).map(Json)
}
