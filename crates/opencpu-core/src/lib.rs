//! Core abstractions for OpenCPU session clients.
//!
//! This crate provides the fundamental building blocks:
//! - `OutputFormat` - Format namespaces understood by the server
//! - `HttpRequest` / `HttpResponse` - Transport-neutral request model
//! - `Transport` - Trait implemented by HTTP backends
//! - `SessionValue` - Decoded resource payloads

pub mod format;
pub mod http;
pub mod traits;
pub mod value;

pub use format::{OutputFormat, UnknownFormat};
pub use http::{AttachedResponse, HttpRequest, HttpResponse, Method, RequestOptions, ResponseBody, ResponseHead};
pub use traits::{DecodeError, Transport, TransportError};
pub use value::SessionValue;
