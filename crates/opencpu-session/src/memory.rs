//! In-memory transport.

use std::{
    collections::HashMap,
    io,
    sync::{PoisonError, RwLock},
};

use async_trait::async_trait;
use bytes::Bytes;
use opencpu_core::{
    AttachedResponse, HttpRequest, HttpResponse, ResponseBody, ResponseHead, Transport,
    TransportError,
};

/// Failure class for a scripted error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Request,
    Client,
    Server,
    BadResponse,
}

#[derive(Debug, Clone)]
enum Canned {
    Response { status: u16, body: Bytes },
    Failure { kind: FailureKind, status: Option<u16> },
    UnreadableBody,
}

/// In-memory transport serving canned responses keyed by request path.
///
/// Useful for tests and offline development. Paths without a route answer
/// with a client error carrying a 404 response. Every request is recorded.
pub struct MemoryTransport {
    base_uri: String,
    routes: RwLock<HashMap<String, Canned>>,
    requests: RwLock<Vec<HttpRequest>>,
}

impl MemoryTransport {
    /// Create a transport with no routes.
    #[must_use]
    pub fn new(base_uri: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            routes: RwLock::new(HashMap::new()),
            requests: RwLock::new(Vec::new()),
        }
    }

    /// Serve `body` with status 200 at `path`.
    #[must_use]
    pub fn with_route(self, path: impl Into<String>, body: impl Into<Bytes>) -> Self {
        self.insert_response(path, 200, body);
        self
    }

    /// Serve `body` with `status` at `path`.
    pub fn insert_response(&self, path: impl Into<String>, status: u16, body: impl Into<Bytes>) {
        self.insert(
            path.into(),
            Canned::Response {
                status,
                body: body.into(),
            },
        );
    }

    /// Fail requests to `path` with a transport error of the given class.
    pub fn insert_failure(&self, path: impl Into<String>, kind: FailureKind, status: Option<u16>) {
        self.insert(path.into(), Canned::Failure { kind, status });
    }

    /// Answer 200 at `path` with a body that errors while being read.
    pub fn insert_unreadable(&self, path: impl Into<String>) {
        self.insert(path.into(), Canned::UnreadableBody);
    }

    /// Requests received so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Paths requested so far, in order.
    #[must_use]
    pub fn requested_paths(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.path).collect()
    }

    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn insert(&self, path: String, canned: Canned) {
        self.routes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path, canned);
    }
}

fn canonical_reason(status: u16) -> Option<String> {
    let reason = match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        410 => "Gone",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => return None,
    };
    Some(reason.to_string())
}

fn attached(status: u16, body: &str) -> AttachedResponse {
    AttachedResponse {
        head: ResponseHead::new(status, canonical_reason(status)),
        body: body.to_string(),
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn base_uri(&self) -> &str {
        &self.base_uri
    }

    async fn request(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let canned = self
            .routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&request.path)
            .cloned();

        let request = request.clone();
        match canned {
            Some(Canned::Response { status, body }) => Ok(HttpResponse::new(
                ResponseHead::new(status, canonical_reason(status)),
                ResponseBody::from_bytes(body),
            )),
            Some(Canned::UnreadableBody) => {
                let chunks = vec![
                    Ok(Bytes::from_static(b"partial")),
                    Err(io::Error::new(io::ErrorKind::ConnectionReset, "body stream reset")),
                ];
                Ok(HttpResponse::new(
                    ResponseHead::new(200, canonical_reason(200)),
                    ResponseBody::from_stream(futures::stream::iter(chunks)),
                ))
            }
            Some(Canned::Failure { kind, status }) => {
                let response = status.map(|s| attached(s, "scripted failure"));
                let message = format!("scripted {kind:?} failure");
                Err(match kind {
                    FailureKind::Request => TransportError::Request {
                        message,
                        request,
                        response,
                    },
                    FailureKind::Client => TransportError::Client {
                        message,
                        request,
                        response,
                    },
                    FailureKind::Server => TransportError::Server {
                        message,
                        request,
                        response,
                    },
                    FailureKind::BadResponse => TransportError::BadResponse {
                        message,
                        request,
                        response,
                    },
                })
            }
            None => Err(TransportError::Client {
                message: format!("no route for {}", request.path),
                response: Some(attached(404, "")),
                request,
            }),
        }
    }
}
