use reqwest::blocking::Client as HttpClient;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Url;
use std::time::Duration;

use crate::request::WireRequest;
use crate::{BoxError, ClientError, Result};

/// Status and fully read body of a completed exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl WireResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The host could not be reached at all
    #[error("connection failed: {0}")]
    Connect(#[source] BoxError),

    #[error("transport failed: {0}")]
    Other(#[source] BoxError),
}

/// Performs one HTTP exchange.
///
/// Implementations must read the whole body before returning so the
/// underlying connection goes back to the pool on every path.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        url: &Url,
        request: &WireRequest,
    ) -> std::result::Result<WireResponse, TransportError>;
}

/// Blocking reqwest transport with a pooled, JSON-only client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: HttpClient,
    timeout: Option<Duration>,
}

impl HttpTransport {
    /// Transport that waits on the server for as long as it takes
    pub fn new(max_idle_per_host: usize) -> Result<Self> {
        Self::with_timeout(max_idle_per_host, None)
    }

    /// Transport with a total per-request deadline; `None` disables it
    pub fn with_timeout(max_idle_per_host: usize, timeout: Option<Duration>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        // The blocking builder otherwise applies a 30s total timeout
        let client = HttpClient::builder()
            .default_headers(headers)
            .pool_max_idle_per_host(max_idle_per_host)
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::client_with("Failed to build HTTP client", e))?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        url: &Url,
        request: &WireRequest,
    ) -> std::result::Result<WireResponse, TransportError> {
        let mut builder = self.client.request(request.method.clone(), url.clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().map_err(classify)?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(classify)?;
        Ok(WireResponse {
            status,
            body: body.to_vec(),
        })
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_connect() {
        TransportError::Connect(Box::new(err))
    } else {
        TransportError::Other(Box::new(err))
    }
}
