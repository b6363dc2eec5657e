//! Maps failed HTTP responses onto typed client errors.

use reqwest::StatusCode;
use terrastore_core::ErrorMessage;

use crate::ClientError;

/// Operation-specific error handling, layered over the default mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorFamily {
    Get,
    Conditional,
    MapReduce,
    Update,
    Merge,
    General,
}

/// Translate a non-successful response into the error the caller sees
pub fn translate(family: ErrorFamily, status: u16, body: &[u8]) -> ClientError {
    match (family, status) {
        (ErrorFamily::Get, 404) | (ErrorFamily::Update, 404) => {
            let msg = error_message(status, body);
            ClientError::NoSuchKey {
                status: msg.code,
                message: msg.message,
            }
        }
        (ErrorFamily::Conditional, 400) => request_error(error_message(status, body)),
        (ErrorFamily::Conditional, 404) | (ErrorFamily::Conditional, 409) => {
            let msg = error_message(status, body);
            ClientError::UnsatisfiedCondition {
                status: msg.code,
                message: msg.message,
            }
        }
        (ErrorFamily::MapReduce, 400) => {
            let msg = error_message(status, body);
            ClientError::MapReduceQuery {
                status: msg.code,
                message: msg.message,
            }
        }
        // Merge has no overrides of its own
        _ => general_error(status, body),
    }
}

fn general_error(status: u16, body: &[u8]) -> ClientError {
    match status {
        500 => match serde_json::from_slice::<ErrorMessage>(body) {
            Ok(msg) => request_error(msg),
            Err(err) => {
                tracing::debug!(error = %err, "Undecodable 500 response body");
                ClientError::Server {
                    message: "Unexpected server error.".to_string(),
                }
            }
        },
        503 => ClientError::ClusterUnavailable {
            message: "The server cluster, or parts of the cluster, is not available.".to_string(),
        },
        _ => request_error(error_message(status, body)),
    }
}

fn request_error(msg: ErrorMessage) -> ClientError {
    ClientError::Request {
        status: msg.code,
        message: msg.message,
    }
}

/// Decode the error body, falling back to the HTTP status and raw text
fn error_message(status: u16, body: &[u8]) -> ErrorMessage {
    match serde_json::from_slice::<ErrorMessage>(body) {
        Ok(msg) => msg,
        Err(_) => {
            let text = String::from_utf8_lossy(body).trim().to_string();
            let message = if text.is_empty() {
                StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("Unknown error")
                    .to_string()
            } else {
                text
            };
            ErrorMessage::new(i32::from(status), message)
        }
    }
}
