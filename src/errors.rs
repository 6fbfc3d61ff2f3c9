//! Typed error hierarchy for the refiner.
//!
//! Two top-level enums cover the two subsystems:
//! - `BackendError`: failures talking to the reasoning backend
//! - `SessionError`: failures driving the session controller itself

use std::time::Duration;

use thiserror::Error;

/// Prefix shown in front of every backend failure surfaced to the user.
pub const USER_ERROR_PREFIX: &str = "An error occurred: ";

/// Errors from a single call to the reasoning backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend answered with a non-2xx status.
    #[error("HTTP error! status: {status}")]
    Status { status: u16 },

    /// The request never produced a response (DNS, refused connection, reset).
    #[error("{0}")]
    Transport(String),

    #[error("request timed out after {}s", after.as_secs())]
    Timeout { after: Duration },

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("backend returned an empty improved question")]
    EmptyImprovedQuestion,

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),
}

impl BackendError {
    /// Message stored in the session when a cycle fails on this error.
    pub fn user_message(&self) -> String {
        format!("{}{}", USER_ERROR_PREFIX, self)
    }

    /// Classify a reqwest failure, keeping timeouts distinct from transport errors.
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            BackendError::Timeout { after: timeout }
        } else if let Some(status) = err.status() {
            BackendError::Status {
                status: status.as_u16(),
            }
        } else if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Transport(err.to_string())
        }
    }
}

/// Errors from the session controller handle.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session controller has shut down")]
    ControllerClosed,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
