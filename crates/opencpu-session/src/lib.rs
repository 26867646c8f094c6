//! Session resolution and resource access for OpenCPU servers.
//!
//! Provides:
//! - `Session` - Resolve a session directory and read its resources
//! - `CallStatus` - Recorded failure of a session call
//! - `MemoryTransport` - Canned-response transport (feature: memory)

pub mod listing;
pub mod session;
pub mod status;

#[cfg(feature = "memory")]
pub mod memory;

pub use listing::ResourceIndex;
pub use session::Session;
pub use status::CallStatus;

#[cfg(feature = "memory")]
pub use memory::{FailureKind, MemoryTransport};
