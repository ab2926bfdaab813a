//! Booking backends
//!
//! [`BookingBackend`] is the seam between the HTTP surface and whatever
//! actually holds the calendar. [`MockBookingBackend`] serves a fixed day
//! and records created appointments in memory.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use parking_lot::Mutex;
use tracing::info;

use crate::config::BookingsConfig;
use crate::error::{BookingError, BookingResult};
use crate::types::{
    AppointmentSummary, AvailabilityRequest, BookingAppointment, BookingConfirmation, TimeSlot,
};

/// Length of an appointment when the request gives no end time
pub const DEFAULT_APPOINTMENT_MINUTES: i64 = 60;

#[async_trait]
pub trait BookingBackend: Send + Sync {
    /// Slots for the requested day
    async fn check_availability(&self, request: &AvailabilityRequest) -> BookingResult<Vec<TimeSlot>>;

    /// Book an appointment; the request has already been validated
    async fn create_appointment(
        &self,
        appointment: &BookingAppointment,
    ) -> BookingResult<BookingConfirmation>;
}

/// In-memory backend with a fixed five-slot day
pub struct MockBookingBackend {
    business_id: Option<String>,
    created: Mutex<Vec<BookingConfirmation>>,
}

impl MockBookingBackend {
    pub fn new(business_id: Option<String>) -> Self {
        Self {
            business_id: business_id.filter(|id| !id.trim().is_empty()),
            created: Mutex::new(Vec::new()),
        }
    }

    pub fn from_config(config: &BookingsConfig) -> Self {
        Self::new(config.business_id.clone())
    }

    /// Backend with no business id; every request fails as unconfigured
    pub fn unconfigured() -> Self {
        Self::new(None)
    }

    pub fn business_id(&self) -> Option<&str> {
        self.business_id.as_deref()
    }

    /// Appointments created so far, oldest first
    pub fn bookings(&self) -> Vec<BookingConfirmation> {
        self.created.lock().clone()
    }

    fn require_business(&self) -> BookingResult<&str> {
        self.business_id.as_deref().ok_or(BookingError::Unconfigured)
    }

    fn day_schedule() -> Vec<TimeSlot> {
        vec![
            TimeSlot::new("09:00 AM", "10:00 AM", true),
            TimeSlot::new("10:00 AM", "11:00 AM", true),
            TimeSlot::new("11:00 AM", "12:00 PM", false),
            TimeSlot::new("02:00 PM", "03:00 PM", true),
            TimeSlot::new("03:00 PM", "04:00 PM", true),
        ]
    }
}

#[async_trait]
impl BookingBackend for MockBookingBackend {
    async fn check_availability(&self, request: &AvailabilityRequest) -> BookingResult<Vec<TimeSlot>> {
        let business = self.require_business()?;
        info!("Serving availability for {} on {} ({:?})", business, request.date, request.service_type);
        Ok(Self::day_schedule())
    }

    async fn create_appointment(
        &self,
        appointment: &BookingAppointment,
    ) -> BookingResult<BookingConfirmation> {
        self.require_business()?;

        let booking_id = format!("BOOKING-{}", Utc::now().timestamp_millis());
        let end_date_time = if appointment.end_date_time.trim().is_empty() {
            default_end(&appointment.start_date_time).unwrap_or_default()
        } else {
            appointment.end_date_time.clone()
        };

        let confirmation = BookingConfirmation {
            success: true,
            booking_id: booking_id.clone(),
            message: "Appointment successfully scheduled".to_string(),
            appointment: AppointmentSummary {
                id: booking_id,
                customer_name: appointment.customer_name.clone(),
                customer_email: appointment.customer_email.clone(),
                start_date_time: appointment.start_date_time.clone(),
                end_date_time,
            },
        };

        info!(
            "Booking {} created for {} at {}",
            confirmation.booking_id, appointment.customer_name, appointment.start_date_time
        );
        self.created.lock().push(confirmation.clone());
        Ok(confirmation)
    }
}

/// End time for a start given as RFC 3339 or a naive `YYYY-MM-DDTHH:MM[:SS]`
fn default_end(start: &str) -> Option<String> {
    let length = Duration::minutes(DEFAULT_APPOINTMENT_MINUTES);

    if let Ok(start) = DateTime::parse_from_rfc3339(start) {
        return Some((start + length).to_rfc3339());
    }

    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(start, format).ok())
        .map(|start| (start + length).format("%Y-%m-%dT%H:%M:%S").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_backend_rejects_everything() {
        let backend = MockBookingBackend::new(Some("   ".into()));
        assert_eq!(backend.business_id(), None);

        let err = backend
            .check_availability(&AvailabilityRequest::new("2026-03-02"))
            .await
            .unwrap_err();
        assert_eq!(err, BookingError::Unconfigured);

        let appointment = BookingAppointment::new("Asha", "asha@example.com", "2026-03-02T09:00:00");
        assert_eq!(
            backend.create_appointment(&appointment).await.unwrap_err(),
            BookingError::Unconfigured
        );
    }

    #[tokio::test]
    async fn test_day_schedule() {
        let backend = MockBookingBackend::new(Some("contoso".into()));
        let slots = backend
            .check_availability(&AvailabilityRequest::new("2026-03-02"))
            .await
            .unwrap();
        assert_eq!(slots.len(), 5);
        assert_eq!(slots.iter().filter(|s| s.available).count(), 4);
        assert_eq!(slots[2], TimeSlot::new("11:00 AM", "12:00 PM", false));
    }

    #[tokio::test]
    async fn test_created_appointment_is_recorded() {
        let backend = MockBookingBackend::new(Some("contoso".into()));
        let appointment = BookingAppointment::new("Asha", "asha@example.com", "2026-03-02T09:00:00");

        let confirmation = backend.create_appointment(&appointment).await.unwrap();
        assert!(confirmation.booking_id.starts_with("BOOKING-"));
        assert_eq!(confirmation.appointment.id, confirmation.booking_id);
        assert_eq!(confirmation.appointment.end_date_time, "2026-03-02T10:00:00");
        assert_eq!(backend.bookings(), vec![confirmation]);
    }

    #[test]
    fn test_default_end() {
        assert_eq!(
            default_end("2026-03-02T14:30").as_deref(),
            Some("2026-03-02T15:30:00")
        );
        assert_eq!(
            default_end("2026-03-02T09:00:00+05:30").as_deref(),
            Some("2026-03-02T10:00:00+05:30")
        );
        assert_eq!(default_end("next tuesday"), None);
    }
}
