//! Error taxonomy for backend calls

use thiserror::Error;

/// Text shown when the request never completed
pub const CONNECTION_ERROR: &str = "Connection error. Please check your internet and try again.";

/// A failed backend call.
///
/// Validation failures never reach this type: they are caught before a request
/// is issued (see `auth::ValidationError` and `session::SendError`).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// The request could not be sent or the connection dropped
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status
    #[error("backend returned {status}: {}", .message.as_deref().unwrap_or("no error message"))]
    Application {
        status: u16,
        /// The `error` field of the response body, if any
        message: Option<String>,
    },

    /// The response body did not match the expected shape
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn application(status: u16, message: impl Into<String>) -> Self {
        Self::Application {
            status,
            message: Some(message.into()),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Text to show the user.
    ///
    /// Application errors carry the server text verbatim; `fallback` covers a
    /// missing message and decode failures; transport errors get the generic
    /// connection text.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Transport(_) => CONNECTION_ERROR.to_string(),
            Self::Application {
                message: Some(message),
                ..
            } if !message.is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }
}
