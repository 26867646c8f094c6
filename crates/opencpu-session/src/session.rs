//! Session handle: resolution, call execution and resource accessors.

use std::{fmt, sync::Arc, time::Instant};

use opencpu_core::{
    AttachedResponse, DecodeError, HttpRequest, HttpResponse, Method, OutputFormat,
    RequestOptions, SessionValue, Transport, TransportError,
};
use tracing::{debug, info, warn};

use crate::{
    listing::{FILE_PREFIX, OBJECT_PREFIX, ResourceIndex},
    status::CallStatus,
};

/// Prefix under which the server exposes session directories.
pub const SESSION_PREFIX: &str = "tmp/";

/// Object name the server uses for the session's return value.
const VALUE_OBJECT: &str = ".val";

/// How a fetched body is turned into a [`SessionValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decode {
    Text,
    Json,
    Binary,
}

impl Decode {
    fn for_object(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => Self::Json,
            f if f.is_binary() => Self::Binary,
            _ => Self::Text,
        }
    }

    fn for_file(format: OutputFormat) -> Self {
        match format {
            OutputFormat::JsonFile => Self::Json,
            f if f.is_binary() => Self::Binary,
            _ => Self::Text,
        }
    }
}

/// Handle to a server-side execution session.
///
/// A session is valid only if it was given an id and a transport and the
/// initial directory listing succeeded. Any later failed call invalidates it
/// for good; reads on an invalid session return `None` without touching the
/// network. Failures never surface as `Err`: inspect [`Session::last_error`].
pub struct Session {
    id: Option<String>,
    base_path: Option<String>,
    transport: Option<Arc<dyn Transport>>,
    exists: bool,
    resources: ResourceIndex,
    last_error: Option<CallStatus>,
}

impl Session {
    /// Resolve a session by listing its directory.
    ///
    /// A missing (or blank) id or a missing transport yields a session that
    /// does not exist, without any request being made.
    pub async fn resolve(id: Option<String>, transport: Option<Arc<dyn Transport>>) -> Self {
        let id = id.filter(|id| !id.trim().is_empty());
        let base_path = id.as_deref().map(|id| format!("{SESSION_PREFIX}{id}/"));
        let mut session = Self {
            exists: id.is_some() && transport.is_some(),
            id,
            base_path,
            transport,
            resources: ResourceIndex::default(),
            last_error: None,
        };

        if !session.exists {
            debug!("Session id or transport missing, not resolving");
            return session;
        }

        let Some(response) = session.call("", Method::Get, RequestOptions::default()).await else {
            return session;
        };

        let head = response.head.clone();
        match response.into_body().bytes().await {
            Ok(body) => {
                session.resources = ResourceIndex::parse(&String::from_utf8_lossy(&body));
                debug!(
                    session = session.id.as_deref().unwrap_or_default(),
                    objects = session.resources.objects.len(),
                    files = session.resources.files.len(),
                    "Session resolved"
                );
            }
            Err(err) => {
                let request = HttpRequest::get(session.base_path.clone().unwrap_or_default());
                session.invalidate(CallStatus::from_transport_error(TransportError::BadResponse {
                    message: format!("failed to read listing: {err}"),
                    request,
                    response: Some(AttachedResponse {
                        head,
                        body: String::new(),
                    }),
                }));
            }
        }
        session
    }

    /// Resolve a session from an id and a transport that are both present.
    pub async fn connect(id: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self::resolve(Some(id.into()), Some(transport)).await
    }

    /// Issue one request against a path below the session directory.
    ///
    /// Returns the response when its status is below 400. Any other outcome
    /// marks the session as non-existent, records a [`CallStatus`] and
    /// returns `None`.
    pub async fn call(
        &mut self,
        sub_path: &str,
        method: Method,
        options: RequestOptions,
    ) -> Option<HttpResponse> {
        if !self.exists {
            return None;
        }
        let transport = Arc::clone(self.transport.as_ref()?);
        let base_path = self.base_path.as_deref()?;

        let request = HttpRequest::new(method, format!("{base_path}{sub_path}"), options);
        debug!(method = %request.method, path = %request.path, "Session call");

        let started = Instant::now();
        let result = transport.request(&request).await;
        if request.options.collect_stats {
            info!(
                uri = %join_uri(transport.base_uri(), &request.path),
                seconds = started.elapsed().as_secs_f64(),
                "Transfer stats"
            );
        }

        match result {
            Ok(response) if response.head.is_failure() => {
                let status = CallStatus::from_response(&request, &response.head);
                self.invalidate(status);
                None
            }
            Ok(response) => Some(response),
            Err(err) => {
                self.invalidate(CallStatus::from_transport_error(err));
                None
            }
        }
    }

    /// Fetch the session's return value in `format`.
    ///
    /// With `collect_stats`, the effective URI and transfer time are logged.
    ///
    /// # Errors
    /// Returns [`DecodeError`] if a JSON body cannot be parsed.
    pub async fn get_value(
        &mut self,
        format: OutputFormat,
        collect_stats: bool,
    ) -> Result<Option<SessionValue>, DecodeError> {
        let options = if collect_stats {
            RequestOptions::with_stats()
        } else {
            RequestOptions::default()
        };
        let sub_path = format!("{OBJECT_PREFIX}{VALUE_OBJECT}/{format}");
        self.fetch(&sub_path, Decode::for_object(format), options).await
    }

    /// Fetch a named R object in `format`, or the return value when `name`
    /// is `None`.
    ///
    /// Unlisted objects yield `Ok(None)` without a request.
    ///
    /// # Errors
    /// Returns [`DecodeError`] if a JSON body cannot be parsed.
    pub async fn get_object(
        &mut self,
        name: Option<&str>,
        format: OutputFormat,
    ) -> Result<Option<SessionValue>, DecodeError> {
        let Some(name) = name else {
            return self.get_value(format, false).await;
        };
        if !self.exists || !self.resources.has_object(name) {
            return Ok(None);
        }
        let sub_path = format!("{OBJECT_PREFIX}{name}/{format}");
        self.fetch(&sub_path, Decode::for_object(format), RequestOptions::default())
            .await
    }

    /// Fetch a session file. [`OutputFormat::JsonFile`] parses the body as
    /// JSON, binary formats keep the raw bytes, anything else reads text.
    ///
    /// Unlisted files yield `Ok(None)` without a request.
    ///
    /// # Errors
    /// Returns [`DecodeError`] if a JSON body cannot be parsed.
    pub async fn get_file(
        &mut self,
        file_name: &str,
        format: OutputFormat,
    ) -> Result<Option<SessionValue>, DecodeError> {
        if !self.exists || !self.resources.has_file(file_name) {
            return Ok(None);
        }
        let sub_path = format!("{FILE_PREFIX}{file_name}");
        self.fetch(&sub_path, Decode::for_file(format), RequestOptions::default())
            .await
    }

    /// Absolute URL of a listed session file, for out-of-band downloads.
    #[must_use]
    pub fn get_existing_file_url(&self, file_name: &str) -> Option<String> {
        if !self.exists || !self.resources.has_file(file_name) {
            return None;
        }
        let base_path = self.base_path.as_deref()?;
        let base_uri = self.base_uri()?;
        Some(join_uri(base_uri, &format!("{base_path}{FILE_PREFIX}{file_name}")))
    }

    /// Fetch the code the session ran.
    pub async fn get_source(&mut self) -> Option<String> {
        let response = self
            .call("source", Method::Get, RequestOptions::default())
            .await?;
        let body = response.into_body().bytes().await.ok()?;
        String::from_utf8(body.to_vec()).ok()
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Whether the session is still valid.
    #[must_use]
    pub const fn exists(&self) -> bool {
        self.exists
    }

    /// Last failure recorded by a call, if any.
    #[must_use]
    pub const fn last_error(&self) -> Option<&CallStatus> {
        self.last_error.as_ref()
    }

    /// Session directory relative to the server base URI (`tmp/{id}/`).
    #[must_use]
    pub fn base_path(&self) -> Option<&str> {
        self.base_path.as_deref()
    }

    /// Alias of [`Session::base_path`].
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.base_path()
    }

    /// Base URI of the transport, if one was supplied.
    #[must_use]
    pub fn base_uri(&self) -> Option<&str> {
        self.transport.as_deref().map(|t| t.base_uri())
    }

    /// Listed R object entries (`R/...`).
    #[must_use]
    pub fn object_resources(&self) -> &[String] {
        &self.resources.objects
    }

    /// Listed file entries (`files/...`).
    #[must_use]
    pub fn file_resources(&self) -> &[String] {
        &self.resources.files
    }

    /// Listed entries that are neither objects nor files.
    #[must_use]
    pub fn other_resources(&self) -> &[String] {
        &self.resources.others
    }

    async fn fetch(
        &mut self,
        sub_path: &str,
        decode: Decode,
        options: RequestOptions,
    ) -> Result<Option<SessionValue>, DecodeError> {
        let Some(response) = self.call(sub_path, Method::Get, options).await else {
            return Ok(None);
        };
        let body = match response.into_body().bytes().await {
            Ok(body) => body,
            Err(err) => {
                debug!(path = sub_path, error = %err, "Failed to read response body");
                return Ok(None);
            }
        };
        if body.is_empty() {
            return Ok(None);
        }

        match decode {
            Decode::Json => serde_json::from_slice(&body)
                .map(|value| Some(SessionValue::Json(value)))
                .map_err(|source| DecodeError::Json {
                    path: sub_path.to_string(),
                    source,
                }),
            Decode::Binary => Ok(Some(SessionValue::Binary(body))),
            Decode::Text => match String::from_utf8(body.to_vec()) {
                Ok(text) => Ok(Some(SessionValue::Text(text))),
                Err(err) => {
                    debug!(path = sub_path, error = %err, "Response body is not UTF-8");
                    Ok(None)
                }
            },
        }
    }

    fn invalidate(&mut self, status: CallStatus) {
        warn!(
            session = self.id.as_deref().unwrap_or_default(),
            status = ?status.status_code(),
            "Session call failed: {}",
            status.message()
        );
        self.exists = false;
        self.last_error = Some(status);
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("base_path", &self.base_path)
            .field("exists", &self.exists)
            .field("resources", &self.resources)
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}

fn join_uri(base: &str, path: &str) -> String {
    if base.is_empty() || base.ends_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::memory::{FailureKind, MemoryTransport};

    const BASE: &str = "http://localhost:5656/ocpu/";

    fn transport(listing: &str) -> Arc<MemoryTransport> {
        Arc::new(MemoryTransport::new(BASE).with_route("tmp/x01/", listing.to_string()))
    }

    #[tokio::test]
    async fn test_resolve_partitions_listing() {
        let transport = transport("R/.val\nR/a\nfiles/out.csv\nsource\nstdout\n");
        let session = Session::connect("x01", transport.clone()).await;

        assert!(session.exists());
        assert_eq!(session.base_path(), Some("tmp/x01/"));
        assert_eq!(session.object_resources(), ["R/.val", "R/a"]);
        assert_eq!(session.file_resources(), ["files/out.csv"]);
        assert_eq!(session.other_resources(), ["source", "stdout"]);
        assert_eq!(transport.requested_paths(), vec!["tmp/x01/"]);
        assert!(session.last_error().is_none());
    }

    #[tokio::test]
    async fn test_missing_inputs_make_no_request() {
        let transport = transport("R/.val\n");

        let no_id = Session::resolve(None, Some(transport.clone())).await;
        assert!(!no_id.exists());
        assert_eq!(no_id.base_path(), None);

        let blank_id = Session::resolve(Some("  ".into()), Some(transport.clone())).await;
        assert!(!blank_id.exists());

        let no_transport = Session::resolve(Some("x01".into()), None).await;
        assert!(!no_transport.exists());
        assert_eq!(no_transport.base_path(), Some("tmp/x01/"));
        assert!(no_transport.object_resources().is_empty());

        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_listing_invalidates() {
        let transport = Arc::new(MemoryTransport::new(BASE));
        transport.insert_response("tmp/x01/", 404, "");
        let session = Session::connect("x01", transport).await;

        assert!(!session.exists());
        assert!(session.object_resources().is_empty());
        assert!(session.file_resources().is_empty());
        let status = session.last_error().unwrap();
        assert_eq!(status.status_code(), Some(404));
        assert!(status.message().contains("Not Found"));
    }

    #[tokio::test]
    async fn test_unreadable_listing_invalidates() {
        let transport = Arc::new(MemoryTransport::new(BASE));
        transport.insert_unreadable("tmp/x01/");
        let session = Session::connect("x01", transport).await;

        assert!(!session.exists());
        let status = session.last_error().unwrap();
        assert_eq!(status.status_code(), Some(200));
        assert!(matches!(status.cause(), Some(TransportError::BadResponse { .. })));
    }

    #[tokio::test]
    async fn test_transport_failures_map_status_codes() {
        let cases = [
            (FailureKind::Request, None, None),
            (FailureKind::Request, Some(408), Some(408)),
            (FailureKind::Client, None, Some(400)),
            (FailureKind::Client, Some(403), Some(403)),
            (FailureKind::Server, None, Some(500)),
            (FailureKind::Server, Some(502), Some(502)),
            (FailureKind::BadResponse, None, None),
        ];
        for (kind, attached, expected) in cases {
            let transport = Arc::new(MemoryTransport::new(BASE));
            transport.insert_failure("tmp/x01/", kind, attached);
            let session = Session::connect("x01", transport).await;

            assert!(!session.exists(), "{kind:?}");
            assert_eq!(session.last_error().unwrap().status_code(), expected, "{kind:?}");
        }
    }

    #[tokio::test]
    async fn test_get_value_decodes_by_format() {
        let transport = transport("R/.val\n");
        transport.insert_response("tmp/x01/R/.val/json", 200, "[1,2,3]");
        transport.insert_response("tmp/x01/R/.val/print", 200, "[1] 1 2 3\n");
        transport.insert_response("tmp/x01/R/.val/rds", 200, vec![0x58_u8, 0x0a, 0xff]);
        let mut session = Session::connect("x01", transport).await;

        let json = session.get_value(OutputFormat::Json, false).await.unwrap();
        assert_eq!(json, Some(SessionValue::Json(json!([1, 2, 3]))));

        let text = session.get_value(OutputFormat::Print, true).await.unwrap();
        assert_eq!(text.and_then(SessionValue::into_text).as_deref(), Some("[1] 1 2 3\n"));

        let rds = session.get_value(OutputFormat::Rds, false).await.unwrap();
        assert_eq!(rds.unwrap().as_binary().map(|b| b.len()), Some(3));
        assert!(session.exists());
    }

    #[tokio::test]
    async fn test_empty_body_is_none() {
        let transport = transport("R/.val\n");
        transport.insert_response("tmp/x01/R/.val/json", 200, "");
        let mut session = Session::connect("x01", transport).await;

        assert_eq!(session.get_value(OutputFormat::Json, false).await.unwrap(), None);
        assert!(session.exists());
    }

    #[tokio::test]
    async fn test_invalid_json_is_decode_error() {
        let transport = transport("R/.val\nR/a\n");
        transport.insert_response("tmp/x01/R/a/json", 200, "{not json");
        let mut session = Session::connect("x01", transport).await;

        let err = session
            .get_object(Some("a"), OutputFormat::Json)
            .await
            .unwrap_err();
        assert!(matches!(err, DecodeError::Json { ref path, .. } if path == "R/a/json"));
        assert!(session.exists());
    }

    #[tokio::test]
    async fn test_unreadable_body_is_none() {
        let transport = transport("R/.val\n");
        transport.insert_unreadable("tmp/x01/R/.val/print");
        let mut session = Session::connect("x01", transport).await;

        assert_eq!(session.get_value(OutputFormat::Print, false).await.unwrap(), None);
        assert!(session.exists());
        assert!(session.last_error().is_none());
    }

    #[tokio::test]
    async fn test_get_object_without_name_reads_value() {
        let transport = transport("R/.val\n");
        transport.insert_response("tmp/x01/R/.val/csv", 200, "\"x\"\n1\n");
        let mut session = Session::connect("x01", transport.clone()).await;

        let via_value = session.get_value(OutputFormat::Csv, false).await.unwrap();
        let via_object = session.get_object(None, OutputFormat::Csv).await.unwrap();
        assert_eq!(via_value, via_object);
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn test_file_json_and_url() {
        let transport = transport("files/result.json\n");
        transport.insert_response("tmp/x01/files/result.json", 200, r#"{"ok":true}"#);
        let mut session = Session::connect("x01", transport).await;

        let value = tokio_test::assert_ok!(
            session
                .get_file("result.json", OutputFormat::JsonFile)
                .await
        );
        assert_eq!(value.as_ref().and_then(SessionValue::as_json), Some(&json!({"ok": true})));
        assert_eq!(value.and_then(SessionValue::into_json), Some(json!({"ok": true})));

        assert_eq!(
            session.get_existing_file_url("result.json").as_deref(),
            Some("http://localhost:5656/ocpu/tmp/x01/files/result.json")
        );
        assert_eq!(session.get_existing_file_url("other.json"), None);
    }

    #[tokio::test]
    async fn test_invalid_json_file_is_decode_error() {
        let transport = transport("files/broken.json\n");
        transport.insert_response("tmp/x01/files/broken.json", 200, "{\"ok\": tru");
        let mut session = Session::connect("x01", transport).await;

        let err = tokio_test::assert_err!(
            session
                .get_file("broken.json", OutputFormat::JsonFile)
                .await
        );
        assert!(matches!(err, DecodeError::Json { ref path, .. } if path == "files/broken.json"));
        assert!(session.exists());
        assert!(session.last_error().is_none());
    }

    #[tokio::test]
    async fn test_binary_file_keeps_bytes() {
        let png = vec![0x89_u8, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0xff];
        let transport = transport("files/plot.png\n");
        transport.insert_response("tmp/x01/files/plot.png", 200, png.clone());
        let mut session = Session::connect("x01", transport).await;

        let value = tokio_test::assert_ok!(session.get_file("plot.png", OutputFormat::Png).await);
        let value = value.unwrap();
        assert!(value.as_text().is_none());
        assert_eq!(value.as_binary().map(|b| b.to_vec()), Some(png));
    }

    #[tokio::test]
    async fn test_text_file_is_text() {
        let transport = transport("files/notes.txt\n");
        transport.insert_response("tmp/x01/files/notes.txt", 200, "done\n");
        let mut session = Session::connect("x01", transport).await;

        let value = tokio_test::assert_ok!(session.get_file("notes.txt", OutputFormat::TextFile).await);
        assert_eq!(value.as_ref().and_then(SessionValue::as_text), Some("done\n"));
        assert!(value.and_then(SessionValue::into_json).is_none());
    }

    #[tokio::test]
    async fn test_get_source() {
        let transport = transport("source\n");
        transport.insert_response("tmp/x01/source", 200, "summary(cars)");
        let mut session = Session::connect("x01", transport).await;

        assert_eq!(session.get_source().await.as_deref(), Some("summary(cars)"));
    }

    #[tokio::test]
    async fn test_failure_is_permanent() {
        let transport = transport("R/.val\nR/a\nfiles/out.csv\n");
        transport.insert_failure("tmp/x01/R/a/print", FailureKind::Server, Some(503));
        transport.insert_response("tmp/x01/R/.val/print", 200, "[1] 42");
        transport.insert_response("tmp/x01/source", 200, "42");
        let mut session = Session::connect("x01", transport.clone()).await;

        assert_eq!(session.get_object(Some("a"), OutputFormat::Print).await.unwrap(), None);
        assert!(!session.exists());
        assert_eq!(session.last_error().unwrap().status_code(), Some(503));
        let calls = transport.request_count();

        assert_eq!(session.get_value(OutputFormat::Print, false).await.unwrap(), None);
        assert_eq!(session.get_source().await, None);
        assert_eq!(session.get_file("out.csv", OutputFormat::TextFile).await.unwrap(), None);
        assert_eq!(session.get_existing_file_url("out.csv"), None);
        assert!(session.call("source", Method::Get, RequestOptions::default()).await.is_none());
        assert_eq!(transport.request_count(), calls);
    }

    #[test]
    fn test_join_uri() {
        assert_eq!(join_uri("http://h/ocpu/", "tmp/a/"), "http://h/ocpu/tmp/a/");
        assert_eq!(join_uri("http://h/ocpu", "tmp/a/"), "http://h/ocpu/tmp/a/");
        assert_eq!(join_uri("", "tmp/a/"), "tmp/a/");
    }
}
