//! Terrastore Core Library
//!
//! Shared building blocks for the Terrastore client:
//! - Operation contexts for every remote call
//! - Request/response payload models
//! - Type-keyed JSON codec registry
//! - Ordered multi-document collections
//! - Client configuration

pub mod codec;
pub mod config;
pub mod context;
pub mod models;
pub mod values;

// Re-export commonly used types
pub use codec::{CodecError, CodecRegistry, JsonObjectDescriptor};
pub use config::{ClientConfig, HostPolicy, LoggingConfig};
pub use context::*;
pub use models::*;
pub use values::{Values, ValuesSeed};
