//! Transport-neutral HTTP request and response model.

use std::{fmt, io};

use bytes::{Bytes, BytesMut};
use futures::{StreamExt, stream::BoxStream};
use serde::{Deserialize, Serialize};

/// HTTP method used for session calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
}

impl Method {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Log the effective URI and transfer time once the call returns.
    pub collect_stats: bool,
    /// Extra request headers.
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    /// Options with stats collection enabled.
    #[must_use]
    pub fn with_stats() -> Self {
        Self {
            collect_stats: true,
            ..Self::default()
        }
    }

    /// Add a request header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Outgoing request, with a path relative to the transport base URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub path: String,
    pub options: RequestOptions,
}

impl HttpRequest {
    /// Create a new request.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>, options: RequestOptions) -> Self {
        Self {
            method,
            path: path.into(),
            options,
        }
    }

    /// Create a GET request with default options.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path, RequestOptions::default())
    }
}

impl fmt::Display for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} HTTP/1.1", self.method, self.path)?;
        for (name, value) in &self.options.headers {
            write!(f, "\r\n{name}: {value}")?;
        }
        Ok(())
    }
}

/// Status line and headers of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u16,
    pub reason: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    /// Create a head with no headers.
    #[must_use]
    pub fn new(status: u16, reason: Option<String>) -> Self {
        Self {
            status,
            reason,
            headers: Vec::new(),
        }
    }

    /// Reason phrase, or an empty string when the transport gave none.
    #[must_use]
    pub fn reason_phrase(&self) -> &str {
        self.reason.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub const fn is_failure(&self) -> bool {
        self.status >= 400
    }
}

impl fmt::Display for ResponseHead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/1.1 {}", self.status)?;
        if let Some(reason) = &self.reason {
            write!(f, " {reason}")?;
        }
        for (name, value) in &self.headers {
            write!(f, "\r\n{name}: {value}")?;
        }
        Ok(())
    }
}

/// Response captured alongside a transport error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedResponse {
    pub head: ResponseHead,
    pub body: String,
}

impl fmt::Display for AttachedResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\r\n\r\n{}", self.head, self.body)
    }
}

/// Response body, readable exactly once.
pub struct ResponseBody {
    stream: BoxStream<'static, io::Result<Bytes>>,
}

impl ResponseBody {
    /// A body with no content.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_stream(futures::stream::empty())
    }

    /// A body backed by an in-memory buffer.
    #[must_use]
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self::from_stream(futures::stream::once(async move { Ok(data) }))
    }

    /// A body backed by a chunk stream.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: futures::Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self {
            stream: stream.boxed(),
        }
    }

    /// Read the remaining contents.
    ///
    /// # Errors
    /// Returns the first error yielded by the underlying stream.
    pub async fn bytes(mut self) -> io::Result<Bytes> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.stream.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBody").finish_non_exhaustive()
    }
}

/// Response returned by a [`crate::Transport`].
#[derive(Debug)]
pub struct HttpResponse {
    pub head: ResponseHead,
    pub body: ResponseBody,
}

impl HttpResponse {
    #[must_use]
    pub const fn new(head: ResponseHead, body: ResponseBody) -> Self {
        Self { head, body }
    }

    #[must_use]
    pub const fn status(&self) -> u16 {
        self.head.status
    }

    #[must_use]
    pub fn reason_phrase(&self) -> &str {
        self.head.reason_phrase()
    }

    /// Consume the response, returning its body.
    #[must_use]
    pub fn into_body(self) -> ResponseBody {
        self.body
    }
}
