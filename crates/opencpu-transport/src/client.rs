//! reqwest-backed transport.

use std::{io, time::Duration};

use async_trait::async_trait;
use futures::TryStreamExt;
use opencpu_core::{
    AttachedResponse, HttpRequest, HttpResponse, Method, ResponseBody, ResponseHead, Transport,
    TransportError,
};

use crate::config::{ConfigError, TransportConfig};

/// HTTP transport talking to an OpenCPU server.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: TransportConfig,
}

impl HttpTransport {
    /// Build a transport from its configuration.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be constructed.
    pub fn new(config: TransportConfig) -> Result<Self, ConfigError> {
        let config = config.normalized();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub const fn config(&self) -> &TransportConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_uri, path.trim_start_matches('/'))
    }
}

const fn to_reqwest(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
    }
}

fn head_of(response: &reqwest::Response) -> ResponseHead {
    let status = response.status();
    ResponseHead {
        status: status.as_u16(),
        reason: status.canonical_reason().map(ToString::to_string),
        headers: response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect(),
    }
}

/// Map a reqwest error onto the transport failure classes.
fn classify(err: &reqwest::Error, request: &HttpRequest) -> TransportError {
    let message = err.to_string();
    let request = request.clone();
    let response = err.status().map(|status| AttachedResponse {
        head: ResponseHead::new(status.as_u16(), status.canonical_reason().map(ToString::to_string)),
        body: String::new(),
    });

    if err.is_decode() || err.is_body() {
        return TransportError::BadResponse {
            message,
            request,
            response,
        };
    }
    match err.status() {
        Some(status) if status.is_client_error() => TransportError::Client {
            message,
            request,
            response,
        },
        Some(status) if status.is_server_error() => TransportError::Server {
            message,
            request,
            response,
        },
        _ => TransportError::Request {
            message,
            request,
            response,
        },
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn base_uri(&self) -> &str {
        &self.config.base_uri
    }

    async fn request(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = self.url(&request.path);
        tracing::debug!(method = %request.method, %url, "HTTP request");

        let mut builder = self.client.request(to_reqwest(request.method), &url);
        for (name, value) in &request.options.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(username) = &self.config.username {
            builder = builder.basic_auth(username, self.config.password.as_deref());
        }

        let response = builder
            .send()
            .await
            .map_err(|err| classify(&err, request))?;
        let head = head_of(&response);

        if self.config.http_errors && head.is_failure() {
            let status = head.status;
            let body = response.text().await.unwrap_or_default();
            let message = format!("{url} answered {status}");
            let response = Some(AttachedResponse { head, body });
            let request = request.clone();
            return Err(if status >= 500 {
                TransportError::Server {
                    message,
                    request,
                    response,
                }
            } else {
                TransportError::Client {
                    message,
                    request,
                    response,
                }
            });
        }

        let stream = response.bytes_stream().map_err(io::Error::other);
        Ok(HttpResponse::new(head, ResponseBody::from_stream(stream)))
    }
}
