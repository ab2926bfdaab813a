//! Request and response types for the booking boundary
//!
//! Field names follow the camelCase wire format used by the web client and
//! the voice-AI tool calls. Required string fields deserialize to empty when
//! absent so validation can report them uniformly.

use serde::{Deserialize, Serialize};

use crate::error::{BookingError, BookingResult};

/// One slot of a day's schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: String,
    pub end: String,
    pub available: bool,
}

impl TimeSlot {
    pub fn new(start: impl Into<String>, end: impl Into<String>, available: bool) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            available,
        }
    }
}

/// Availability query for one date
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRequest {
    #[serde(default)]
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,
}

impl AvailabilityRequest {
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            service_type: None,
        }
    }

    pub fn with_service_type(mut self, service_type: impl Into<String>) -> Self {
        self.service_type = Some(service_type.into());
        self
    }

    pub fn validate(&self) -> BookingResult<()> {
        if self.date.trim().is_empty() {
            return Err(BookingError::validation("Date is required"));
        }
        Ok(())
    }
}

/// Availability answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    pub success: bool,
    pub date: String,
    #[serde(default)]
    pub service_type: Option<String>,
    pub slots: Vec<TimeSlot>,
}

/// Appointment request from a customer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingAppointment {
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: String,
    #[serde(default)]
    pub customer_phone: String,
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub start_date_time: String,
    #[serde(default)]
    pub end_date_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl BookingAppointment {
    pub fn new(
        customer_name: impl Into<String>,
        customer_email: impl Into<String>,
        start_date_time: impl Into<String>,
    ) -> Self {
        Self {
            customer_name: customer_name.into(),
            customer_email: customer_email.into(),
            start_date_time: start_date_time.into(),
            ..Default::default()
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.customer_phone = phone.into();
        self
    }

    pub fn with_service(mut self, service_id: impl Into<String>) -> Self {
        self.service_id = service_id.into();
        self
    }

    pub fn with_end(mut self, end_date_time: impl Into<String>) -> Self {
        self.end_date_time = end_date_time.into();
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Name, email and start time are required
    pub fn validate(&self) -> BookingResult<()> {
        let missing = [
            &self.customer_name,
            &self.customer_email,
            &self.start_date_time,
        ]
        .iter()
        .any(|field| field.trim().is_empty());

        if missing {
            return Err(BookingError::validation("Missing required fields"));
        }
        Ok(())
    }
}

/// Summary of a created appointment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentSummary {
    pub id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub start_date_time: String,
    pub end_date_time: String,
}

/// Answer to a successful appointment request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmation {
    pub success: bool,
    pub booking_id: String,
    pub message: String,
    pub appointment: AppointmentSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_availability_requires_date() {
        assert!(AvailabilityRequest::new("2026-03-02").validate().is_ok());
        let err = AvailabilityRequest::new("  ").validate().unwrap_err();
        assert_eq!(err, BookingError::validation("Date is required"));
    }

    #[test]
    fn test_appointment_required_fields() {
        let ok = BookingAppointment::new("Asha", "asha@example.com", "2026-03-02T09:00:00");
        assert!(ok.validate().is_ok());

        for broken in [
            BookingAppointment::new("", "asha@example.com", "2026-03-02T09:00:00"),
            BookingAppointment::new("Asha", "", "2026-03-02T09:00:00"),
            BookingAppointment::new("Asha", "asha@example.com", ""),
        ] {
            assert_eq!(
                broken.validate().unwrap_err(),
                BookingError::validation("Missing required fields")
            );
        }
    }

    #[test]
    fn test_appointment_wire_format() {
        let json = serde_json::json!({
            "customerName": "Asha",
            "customerEmail": "asha@example.com",
            "startDateTime": "2026-03-02T09:00:00"
        });
        let appointment: BookingAppointment = serde_json::from_value(json).unwrap();
        assert_eq!(appointment.customer_phone, "");
        assert_eq!(appointment.notes, None);

        let out = serde_json::to_value(appointment.with_notes("VPN keeps dropping")).unwrap();
        assert_eq!(out["startDateTime"], "2026-03-02T09:00:00");
        assert_eq!(out["notes"], "VPN keeps dropping");
    }
}
