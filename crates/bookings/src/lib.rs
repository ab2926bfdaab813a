//! Booking boundary for helpdesk voice agents
//!
//! Support agents can check a day's availability and book follow-up
//! appointments, either from the web client or as tool calls made by the
//! voice assistant through the server webhook.
//!
//! - [`BookingBackend`] - calendar seam, with [`MockBookingBackend`]
//! - [`api::router`] - `axum` routes for the web client and the webhook
//! - [`BookingsConfig`] - business id and listen address from the environment
//!
//! Validation always runs before the configuration check, so a malformed
//! request is reported as a client error even on an unconfigured server.

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod types;
pub mod webhook;

pub use api::{router, serve};
pub use backend::{BookingBackend, MockBookingBackend};
pub use config::BookingsConfig;
pub use error::{BookingError, BookingResult};
pub use types::{
    AppointmentSummary, AvailabilityRequest, AvailabilityResponse, BookingAppointment,
    BookingConfirmation, TimeSlot,
};
