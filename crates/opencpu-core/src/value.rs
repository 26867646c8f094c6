//! Decoded resource payloads.

use bytes::Bytes;
use serde_json::Value;

/// A resource body decoded according to the requested format.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionValue {
    /// Raw text (print, csv, md, source, text files, ...).
    Text(String),
    /// Parsed JSON document.
    Json(Value),
    /// Raw bytes of a binary format (rds, png, ...).
    Binary(Bytes),
}

impl SessionValue {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_binary(&self) -> Option<&Bytes> {
        match self {
            Self::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_json(self) -> Option<Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }
}
