//! Terrastore Client Library
//!
//! Blocking HTTP client for Terrastore document store clusters.
//!
//! ```rust,no_run
//! use terrastore_rs::TerrastoreClient;
//!
//! fn main() -> terrastore_rs::Result<()> {
//!     let client = TerrastoreClient::new("http://localhost:8080")?;
//!     client.bucket("customers").key("sergio").put(&serde_json::json!({"name": "Sergio"}))?;
//!     let customer: serde_json::Value = client.bucket("customers").key("sergio").get()?;
//!     println!("{}", customer);
//!     Ok(())
//! }
//! ```

mod client;
mod connection;
mod host;
mod request;
mod transport;
mod translate;

pub use client::*;
pub use connection::Connection;
pub use host::{HostManager, OrderedHostManager, SingleHostManager};
pub use request::{Operation, WireRequest};
pub use transport::{HttpTransport, Transport, TransportError, WireResponse};
pub use translate::{translate, ErrorFamily};

pub use terrastore_core::{self, ClusterStats, CodecRegistry, JsonObjectDescriptor, Values};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Host unreachable; the host has been suspected in the host manager
    #[error("Unable to connect to: {host}")]
    Connection {
        host: String,
        #[source]
        source: BoxError,
    },

    #[error("Request failed ({status}): {message}")]
    Request { status: i32, message: String },

    #[error("No such key ({status}): {message}")]
    NoSuchKey { status: i32, message: String },

    #[error("Unsatisfied condition ({status}): {message}")]
    UnsatisfiedCondition { status: i32, message: String },

    /// Map/reduce query missing its task, mapper, reducer or timeout
    #[error("Invalid map-reduce query ({status}): {message}")]
    MapReduceQuery { status: i32, message: String },

    #[error("Server error: {message}")]
    Server { message: String },

    #[error("Cluster unavailable: {message}")]
    ClusterUnavailable { message: String },

    #[error("Could not service your request: {message}")]
    Client {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl ClientError {
    pub fn client(message: impl Into<String>) -> Self {
        ClientError::Client {
            message: message.into(),
            source: None,
        }
    }

    pub fn client_with(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        ClientError::Client {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Status code carried by server-side failures
    pub fn status(&self) -> Option<i32> {
        match self {
            ClientError::Request { status, .. }
            | ClientError::NoSuchKey { status, .. }
            | ClientError::UnsatisfiedCondition { status, .. }
            | ClientError::MapReduceQuery { status, .. } => Some(*status),
            ClientError::Server { .. } => Some(500),
            ClientError::ClusterUnavailable { .. } => Some(503),
            ClientError::Connection { .. } | ClientError::Client { .. } => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NoSuchKey { .. })
    }
}

impl From<terrastore_core::CodecError> for ClientError {
    fn from(err: terrastore_core::CodecError) -> Self {
        ClientError::client_with(err.to_string(), err)
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
