//! Core traits for transports and the errors they raise.

use async_trait::async_trait;
use thiserror::Error;

use crate::http::{AttachedResponse, HttpRequest, HttpResponse};

/// Transport error.
///
/// Each variant carries the request that failed and, when the transport got
/// that far, the response it received.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Network failure, timeout, or any error without a usable response.
    #[error("Request failed: {message}")]
    Request {
        message: String,
        request: HttpRequest,
        response: Option<AttachedResponse>,
    },
    /// 4xx response.
    #[error("Client error: {message}")]
    Client {
        message: String,
        request: HttpRequest,
        response: Option<AttachedResponse>,
    },
    /// 5xx response.
    #[error("Server error: {message}")]
    Server {
        message: String,
        request: HttpRequest,
        response: Option<AttachedResponse>,
    },
    /// Response could not be interpreted (bad framing, undecodable body).
    #[error("Malformed response: {message}")]
    BadResponse {
        message: String,
        request: HttpRequest,
        response: Option<AttachedResponse>,
    },
}

impl TransportError {
    #[must_use]
    pub const fn request(&self) -> &HttpRequest {
        match self {
            Self::Request { request, .. }
            | Self::Client { request, .. }
            | Self::Server { request, .. }
            | Self::BadResponse { request, .. } => request,
        }
    }

    #[must_use]
    pub const fn response(&self) -> Option<&AttachedResponse> {
        match self {
            Self::Request { response, .. }
            | Self::Client { response, .. }
            | Self::Server { response, .. }
            | Self::BadResponse { response, .. } => response.as_ref(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Request { message, .. }
            | Self::Client { message, .. }
            | Self::Server { message, .. }
            | Self::BadResponse { message, .. } => message,
        }
    }

    /// Status code derived from the attached response, falling back to the
    /// class default for client (400) and server (500) errors.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        let attached = self.response().map(|r| r.head.status);
        match self {
            Self::Client { .. } => attached.or(Some(400)),
            Self::Server { .. } => attached.or(Some(500)),
            Self::Request { .. } | Self::BadResponse { .. } => attached,
        }
    }
}

/// Decode error for a body fetched in a structured format.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Invalid JSON body for {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Trait for HTTP backends.
///
/// Implementations resolve [`HttpRequest::path`] against their base URI and
/// perform exactly one round trip per call.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Configured base URI, used to build absolute resource URLs.
    fn base_uri(&self) -> &str;

    /// Send a request.
    ///
    /// # Errors
    /// Returns a [`TransportError`] describing the failure class.
    async fn request(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}
