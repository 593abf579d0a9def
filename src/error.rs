//! Error types for the budget API client

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {

    // =============================
    // Server Responses
    // =============================

    /// HTTP 401. The stored token has already been cleared when this is returned.
    #[error("Unauthorized: {}", detail.as_deref().unwrap_or("session is no longer valid"))]
    Unauthorized { detail: Option<String> },

    #[error("Not found: {}", detail.as_deref().unwrap_or("resource does not exist"))]
    NotFound { detail: Option<String> },

    #[error("API error ({status}): {}", detail.as_deref().unwrap_or("no detail"))]
    Api {
        status: StatusCode,
        detail: Option<String>,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Build the error for a non-2xx status from the raw response body.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let detail = extract_detail(body);
        match status {
            StatusCode::UNAUTHORIZED => ClientError::Unauthorized { detail },
            StatusCode::NOT_FOUND => ClientError::NotFound { detail },
            _ => ClientError::Api { status, detail },
        }
    }

    /// Message supplied by the server, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ClientError::Unauthorized { detail }
            | ClientError::NotFound { detail }
            | ClientError::Api { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// Reduce the error to one display string: the server detail, else `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        self.detail().unwrap_or(fallback).to_string()
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }
}

/// Pull the `detail` field out of an error body.
///
/// FastAPI sends either `{"detail": "text"}` or, for validation failures,
/// `{"detail": [{"loc": [...], "msg": "..."}]}`. The list form is flattened.
fn extract_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;

    match value.get("detail")? {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Array(items) => {
            let messages: Vec<String> = items
                .iter()
                .filter_map(|item| {
                    let msg = item.get("msg")?.as_str()?;
                    let field = item
                        .get("loc")
                        .and_then(|loc| loc.as_array())
                        .and_then(|loc| loc.last())
                        .and_then(|last| last.as_str());
                    Some(match field {
                        Some(field) => format!("{}: {}", field, msg),
                        None => msg.to_string(),
                    })
                })
                .collect();

            if messages.is_empty() {
                None
            } else {
                Some(messages.join("; "))
            }
        }
        _ => None,
    }
}
