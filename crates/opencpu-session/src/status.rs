//! Recorded outcome of a failed session call.

use std::fmt;

use opencpu_core::{HttpRequest, ResponseHead, TransportError};

/// Error status captured when a call fails.
///
/// The message concatenates the outgoing request with the failing response
/// (or the transport's description when no response was received).
#[derive(Debug, Clone)]
pub struct CallStatus {
    message: String,
    status_code: Option<u16>,
    cause: Option<TransportError>,
}

impl CallStatus {
    /// Status for a response the transport returned with a failing code.
    #[must_use]
    pub fn from_response(request: &HttpRequest, head: &ResponseHead) -> Self {
        Self {
            message: format!("{request}--{head}"),
            status_code: Some(head.status),
            cause: None,
        }
    }

    /// Status for a transport error.
    #[must_use]
    pub fn from_transport_error(err: TransportError) -> Self {
        let detail = err
            .response()
            .map_or_else(|| err.to_string(), ToString::to_string);
        Self {
            message: format!("{}--{detail}", err.request()),
            status_code: err.status_code(),
            cause: Some(err),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    /// Originating transport error, for diagnostics.
    #[must_use]
    pub const fn cause(&self) -> Option<&TransportError> {
        self.cause.as_ref()
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "[{code}] {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}
