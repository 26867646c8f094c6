//! HTTP transport for OpenCPU session clients.
//!
//! Provides:
//! - `HttpTransport` - reqwest-backed `Transport` implementation
//! - `TransportConfig` - Layered configuration (defaults, file, environment)

pub mod client;
pub mod config;

pub use client::HttpTransport;
pub use config::{ConfigError, TransportConfig};
