//! Resolve an OpenCPU session and print one of its resources.
//!
//! Run with: cargo run -p session-fetch-demo -- <session-id> [object|files/<name>] [format]
//!
//! The server is taken from `OPENCPU_URL` or the config file.

use std::{io::Write, sync::Arc};

use anyhow::{Context, bail};
use opencpu_core::{OutputFormat, SessionValue};
use opencpu_session::Session;
use opencpu_transport::{HttpTransport, TransportConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let Some(session_id) = args.next() else {
        bail!("usage: session-fetch <session-id> [object|files/<name>] [format]");
    };
    let target = args.next();
    let format = args
        .next()
        .map(|f| f.parse::<OutputFormat>())
        .transpose()?
        .unwrap_or_default();

    let config = TransportConfig::load().context("loading transport config")?;
    tracing::info!(server = %config.base_uri, "Using OpenCPU server");
    let transport = Arc::new(HttpTransport::new(config)?);

    let mut session = Session::connect(session_id, transport).await;
    if !session.exists() {
        let reason = session
            .last_error()
            .map_or_else(|| "unknown error".to_string(), ToString::to_string);
        bail!("session could not be resolved: {reason}");
    }

    tracing::info!(
        objects = ?session.object_resources(),
        files = ?session.file_resources(),
        "Session resources"
    );

    let value = match target.as_deref() {
        Some("source") => session.get_source().await.map(SessionValue::Text),
        Some(path) => match path.strip_prefix("files/") {
            Some(name) => {
                if let Some(url) = session.get_existing_file_url(name) {
                    tracing::info!(%url, "File download URL");
                }
                session.get_file(name, format).await?
            }
            None => session.get_object(Some(path), format).await?,
        },
        None => session.get_value(format, true).await?,
    };

    let mut stdout = std::io::stdout().lock();
    match value {
        Some(SessionValue::Text(text)) => stdout.write_all(text.as_bytes())?,
        Some(SessionValue::Json(json)) => writeln!(stdout, "{}", serde_json::to_string_pretty(&json)?)?,
        Some(SessionValue::Binary(bytes)) => stdout.write_all(&bytes)?,
        None => match session.last_error() {
            Some(status) => bail!("request failed: {status}"),
            None => bail!("resource not found"),
        },
    }
    Ok(())
}
