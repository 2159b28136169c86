//! Error types for the Lilypad client.
//!
//! Every failure surfaced by [`LilypadClient`](crate::LilypadClient) is an
//! [`Error`]. Nothing is retried or swallowed at this layer; each variant
//! carries enough context (status and body, offending line, model name) to
//! diagnose the failure without re-running the call.

/// Result type alias for Lilypad operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the Lilypad client.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The requested model is not in the supported allow-list.
    ///
    /// Raised before any network I/O is attempted.
    #[error("model '{model}' is not supported (supported models: {})", .supported.join(", "))]
    UnsupportedModel {
        /// The model identifier that was requested.
        model: String,
        /// The allow-list the model was checked against.
        supported: &'static [&'static str],
    },

    /// The server answered with a non-2xx status.
    #[error("request failed with status {status}: {body}")]
    Request {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// A line of a streaming response could not be decoded.
    #[error("failed to decode stream line {raw_line:?}: {reason}")]
    StreamDecode {
        /// The offending line, after `data: ` prefix stripping.
        raw_line: String,
        /// Why decoding failed.
        reason: String,
    },

    /// A request precondition was violated before any I/O.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Client configuration is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an unsupported model error against the given allow-list.
    #[must_use]
    pub fn unsupported_model(
        model: impl Into<String>,
        supported: &'static [&'static str],
    ) -> Self {
        Self::UnsupportedModel {
            model: model.into(),
            supported,
        }
    }

    /// Create a request error from a status code and response body.
    #[must_use]
    pub fn request(status: u16, body: impl Into<String>) -> Self {
        Self::Request {
            status,
            body: body.into(),
        }
    }

    /// Create a stream decode error for the given line.
    #[must_use]
    pub fn stream_decode(raw_line: impl Into<String>, reason: impl ToString) -> Self {
        Self::StreamDecode {
            raw_line: raw_line.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// The HTTP status carried by a [`Error::Request`], if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the error was raised before any network I/O took place.
    #[must_use]
    pub const fn is_client_side(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedModel { .. } | Self::InvalidRequest(_) | Self::Config(_)
        )
    }
}
