//! Output format namespaces.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Output encoding requested for a session read.
///
/// All variants except [`OutputFormat::TextFile`] and [`OutputFormat::JsonFile`]
/// map to a format namespace on the server (`R/{object}/{format}`). The two
/// file variants only steer how a downloaded file body is decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputFormat {
    /// `application/json` via `jsonlite::toJSON`.
    #[serde(rename = "json")]
    Json,
    /// `text/plain` via `base::print`.
    #[default]
    #[serde(rename = "print")]
    Print,
    /// `text/csv` via `utils::write.csv`.
    #[serde(rename = "csv")]
    Csv,
    /// `application/ndjson` via `jsonlite::stream_out`.
    #[serde(rename = "ndjson")]
    Ndjson,
    /// `text/markdown` via `pander::pander`.
    #[serde(rename = "md")]
    Markdown,
    /// `text/plain` via `utils::write.table`.
    #[serde(rename = "tab")]
    Tab,
    /// `application/octet-stream` via `base::save`.
    #[serde(rename = "rda")]
    Rda,
    /// `application/octet-stream` via `base::saveRDS`.
    #[serde(rename = "rds")]
    Rds,
    /// `application/x-protobuf` via `protolite::serialize_pb`.
    #[serde(rename = "pb")]
    Protobuf,
    /// `application/feather` via `feather::write_feather`.
    #[serde(rename = "feather")]
    Feather,
    /// `image/png` via `grDevices::png`.
    #[serde(rename = "png")]
    Png,
    /// `application/pdf` via `grDevices::pdf`.
    #[serde(rename = "pdf")]
    Pdf,
    /// `image/svg+xml` via `grDevices::svg`.
    #[serde(rename = "svg")]
    Svg,
    /// Session file read as raw text.
    #[serde(rename = "textFile")]
    TextFile,
    /// Session file parsed as JSON.
    #[serde(rename = "jsonFile")]
    JsonFile,
}

impl OutputFormat {
    /// Every known format, in declaration order.
    pub const ALL: [Self; 15] = [
        Self::Json,
        Self::Print,
        Self::Csv,
        Self::Ndjson,
        Self::Markdown,
        Self::Tab,
        Self::Rda,
        Self::Rds,
        Self::Protobuf,
        Self::Feather,
        Self::Png,
        Self::Pdf,
        Self::Svg,
        Self::TextFile,
        Self::JsonFile,
    ];

    /// Path segment used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Print => "print",
            Self::Csv => "csv",
            Self::Ndjson => "ndjson",
            Self::Markdown => "md",
            Self::Tab => "tab",
            Self::Rda => "rda",
            Self::Rds => "rds",
            Self::Protobuf => "pb",
            Self::Feather => "feather",
            Self::Png => "png",
            Self::Pdf => "pdf",
            Self::Svg => "svg",
            Self::TextFile => "textFile",
            Self::JsonFile => "jsonFile",
        }
    }

    /// Content type the server answers with, if any.
    #[must_use]
    pub const fn mime_type(self) -> Option<&'static str> {
        match self {
            Self::Json => Some("application/json"),
            Self::Print | Self::Tab => Some("text/plain"),
            Self::Csv => Some("text/csv"),
            Self::Ndjson => Some("application/ndjson"),
            Self::Markdown => Some("text/markdown"),
            Self::Rda | Self::Rds => Some("application/octet-stream"),
            Self::Protobuf => Some("application/x-protobuf"),
            Self::Feather => Some("application/feather"),
            Self::Png => Some("image/png"),
            Self::Pdf => Some("application/pdf"),
            Self::Svg => Some("image/svg+xml"),
            Self::TextFile | Self::JsonFile => None,
        }
    }

    /// Whether the payload is not text.
    #[must_use]
    pub const fn is_binary(self) -> bool {
        matches!(
            self,
            Self::Rda | Self::Rds | Self::Protobuf | Self::Feather | Self::Png | Self::Pdf
        )
    }

    /// Whether this format only exists on the client side.
    #[must_use]
    pub const fn is_client_local(self) -> bool {
        matches!(self, Self::TextFile | Self::JsonFile)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unrecognised format name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown output format: {0}")]
pub struct UnknownFormat(pub String);

impl FromStr for OutputFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|format| format.as_str() == s)
            .ok_or_else(|| UnknownFormat(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wire_names() {
        assert_eq!("md".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert_eq!("jsonFile".parse::<OutputFormat>().unwrap(), OutputFormat::JsonFile);
        assert_eq!(
            "xlsx".parse::<OutputFormat>(),
            Err(UnknownFormat("xlsx".to_string()))
        );
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&OutputFormat::Protobuf).unwrap();
        assert_eq!(json, "\"pb\"");

        let parsed: OutputFormat = serde_json::from_str("\"textFile\"").unwrap();
        assert_eq!(parsed, OutputFormat::TextFile);
    }

    #[test]
    fn test_default_is_print() {
        assert_eq!(OutputFormat::default(), OutputFormat::Print);
    }

    #[test]
    fn test_classification() {
        assert!(OutputFormat::Png.is_binary());
        assert!(!OutputFormat::Svg.is_binary());
        assert!(OutputFormat::TextFile.is_client_local());
        assert!(OutputFormat::JsonFile.mime_type().is_none());
        assert_eq!(OutputFormat::Csv.mime_type(), Some("text/csv"));
    }
}
