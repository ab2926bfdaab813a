//! Error types and handling for the client-core library
//!
//! This module defines the error taxonomy shared by the call session
//! controller, the media capture engine and the coordinator.
//!
//! # Error Categories
//!
//! - **Request Errors** - Missing or empty required input (e.g. no call target)
//! - **State Errors** - Operation not valid for the current call status
//! - **Device Errors** - Microphone/camera capture failed, classified by cause
//! - **Session Errors** - The remote voice session reported a failure
//! - **Configuration Errors** - Required settings are absent
//!
//! None of these are retried automatically. Device and session errors are
//! also reflected into observable state (call status `error`, a media
//! advisory) so callers that ignore the returned `Result` still see them.
//!
//! # Handling Pattern
//!
//! ```rust
//! use helpdesk_client_core::{ClientError, DeviceErrorCause};
//!
//! fn describe(err: &ClientError) -> &'static str {
//!     match err {
//!         ClientError::DeviceUnavailable { cause: DeviceErrorCause::PermissionDenied, .. } => {
//!             "grant microphone access and try again"
//!         }
//!         ClientError::InvalidRequest { .. } => "check the call target",
//!         _ => "start a new call",
//!     }
//! }
//!
//! let err = ClientError::invalid_request("no assistant id provided");
//! assert_eq!(describe(&err), "check the call target");
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::call::CallStatus;

/// Result type alias for client-core operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Cause of a failed capture attempt
///
/// Distinguished for user messaging only; every cause is handled the same
/// way (capture is abandoned, not retried).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceErrorCause {
    /// The user or platform refused access to the device
    PermissionDenied,
    /// No matching capture device exists
    NotFound,
    /// Anything else
    Unknown,
}

impl DeviceErrorCause {
    /// Stable kebab-case name of the cause
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceErrorCause::PermissionDenied => "permission-denied",
            DeviceErrorCause::NotFound => "not-found",
            DeviceErrorCause::Unknown => "unknown",
        }
    }

    /// One-line advisory shown to the user for this cause
    pub fn advisory(&self) -> &'static str {
        match self {
            DeviceErrorCause::PermissionDenied => {
                "Microphone access denied. Please enable permissions in your browser settings and refresh."
            }
            DeviceErrorCause::NotFound => {
                "No microphone found. Please connect a microphone and refresh."
            }
            DeviceErrorCause::Unknown => {
                "Failed to access microphone. Please check permissions and try again."
            }
        }
    }
}

impl std::fmt::Display for DeviceErrorCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comprehensive error types for support-call client operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    /// Missing or empty required input
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// Operation is not valid for the current call status
    #[error("Invalid call state: cannot {operation} while {current:?}")]
    InvalidState {
        operation: String,
        current: CallStatus,
    },

    /// Capture device could not be acquired
    #[error("Device unavailable ({cause}): {message}")]
    DeviceUnavailable {
        cause: DeviceErrorCause,
        message: String,
    },

    /// The remote voice session reported an error
    #[error("Session error: {message}")]
    SessionError { message: String },

    /// Required configuration is missing
    #[error("Missing required configuration: {field}")]
    MissingConfiguration { field: String },
}

impl ClientError {
    /// Create an invalid request error
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest { reason: reason.into() }
    }

    /// Create an invalid state error
    pub fn invalid_state(operation: impl Into<String>, current: CallStatus) -> Self {
        Self::InvalidState {
            operation: operation.into(),
            current,
        }
    }

    /// Create a device unavailable error
    pub fn device_unavailable(cause: DeviceErrorCause, message: impl Into<String>) -> Self {
        Self::DeviceUnavailable {
            cause,
            message: message.into(),
        }
    }

    /// Create a session error
    pub fn session_error(message: impl Into<String>) -> Self {
        Self::SessionError { message: message.into() }
    }

    /// Create a missing configuration error
    pub fn missing_configuration(field: impl Into<String>) -> Self {
        Self::MissingConfiguration { field: field.into() }
    }

    /// Device error cause, if this is a device error
    pub fn device_cause(&self) -> Option<DeviceErrorCause> {
        match self {
            ClientError::DeviceUnavailable { cause, .. } => Some(*cause),
            _ => None,
        }
    }
}
