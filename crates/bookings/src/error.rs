use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Result type for booking operations
pub type BookingResult<T> = Result<T, BookingError>;

/// Errors raised at the booking boundary
///
/// Each variant maps to one HTTP status; the display text is what callers
/// see in the `error` field of the response body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// A required field was missing or empty
    #[error("{0}")]
    Validation(String),

    /// No booking business is configured
    #[error("Microsoft Bookings not configured")]
    Unconfigured,

    /// The webhook named a tool this service does not provide
    #[error("Unknown function")]
    UnknownFunction(String),

    /// The backend failed to serve the request
    #[error("{0}")]
    Backend(String),
}

impl BookingError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            BookingError::Validation(_) | BookingError::UnknownFunction(_) => {
                StatusCode::BAD_REQUEST
            }
            BookingError::Unconfigured | BookingError::Backend(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// True when the caller can fix the request and retry
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(serde_json::json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            BookingError::validation("Date is required").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(BookingError::Unconfigured.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(BookingError::UnknownFunction("reboot".into()).is_client_error());
        assert!(!BookingError::backend("graph timeout").is_client_error());
    }

    #[test]
    fn test_display_is_the_public_message() {
        assert_eq!(BookingError::validation("Missing required fields").to_string(), "Missing required fields");
        assert_eq!(BookingError::Unconfigured.to_string(), "Microsoft Bookings not configured");
        assert_eq!(BookingError::UnknownFunction("reboot".into()).to_string(), "Unknown function");
    }
}
