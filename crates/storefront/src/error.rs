//! Errors surfaced by the storefront API adapter.
//!
//! Every non-2xx response is mapped here exactly once, by the transport
//! wrapper in [`crate::api`]. A 401 has already torn down the session by the
//! time a caller sees [`ApiError::Unauthorized`].

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::session::SessionError;

/// Longest backend message kept on an error.
const MAX_MESSAGE_CHARS: usize = 200;

/// Errors that can occur when talking to the storefront backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (DNS, refused connection,
    /// timeout, broken body stream).
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend rejected the credential (401). The session is already
    /// cleared and the login redirect has fired.
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// The backend rejected the request (4xx other than 401).
    #[error("Request rejected ({status}): {message}")]
    Validation { status: u16, message: String },

    /// The backend failed (5xx).
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// A success response had an unexpected body.
    #[error("Unexpected response body: {message}")]
    Decode { message: String },

    /// The request could not be built locally.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The session store could not be read or written.
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ApiError {
    /// Map a non-success status and its body to the matching variant.
    #[must_use]
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = backend_message(body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());
        let code = status.as_u16();

        if status == StatusCode::UNAUTHORIZED {
            Self::Unauthorized { message }
        } else if status.is_server_error() {
            Self::Server {
                status: code,
                message,
            }
        } else {
            Self::Validation {
                status: code,
                message,
            }
        }
    }

    /// HTTP status of the failed exchange, when a response arrived.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(err) => err.status().map(|s| s.as_u16()),
            Self::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED.as_u16()),
            Self::Validation { status, .. } | Self::Server { status, .. } => Some(*status),
            Self::Decode { .. } | Self::InvalidRequest(_) | Self::Session(_) => None,
        }
    }

    /// Message suitable for showing inline next to the triggering control.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(_) => "Could not reach the store. Check your connection.".to_string(),
            Self::Unauthorized { .. } => "Please log in again.".to_string(),
            Self::Validation { message, .. } | Self::InvalidRequest(message) => message.clone(),
            Self::Server { .. } | Self::Decode { .. } | Self::Session(_) => {
                "The store had a problem. Please try again.".to_string()
            }
        }
    }
}

/// Error body shapes produced by the backend.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<Detail>,
    #[serde(default)]
    message: Option<String>,
}

/// `detail` is a string for handled errors and a list for request validation
/// failures.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Detail {
    Text(String),
    Fields(Vec<FieldError>),
}

#[derive(Debug, Deserialize)]
struct FieldError {
    #[serde(default)]
    loc: Vec<serde_json::Value>,
    msg: String,
}

/// Extract a human readable message from an error body.
fn backend_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    let message = match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: Some(Detail::Text(text)),
            ..
        }) => text,
        Ok(ErrorBody {
            detail: Some(Detail::Fields(fields)),
            ..
        }) if !fields.is_empty() => fields
            .iter()
            .map(format_field_error)
            .collect::<Vec<_>>()
            .join("; "),
        Ok(ErrorBody {
            message: Some(message),
            ..
        }) => message,
        _ => body.to_string(),
    };

    Some(message.chars().take(MAX_MESSAGE_CHARS).collect())
}

fn format_field_error(error: &FieldError) -> String {
    let field = error
        .loc
        .iter()
        .filter_map(|part| match part {
            serde_json::Value::String(s) if s != "body" => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(".");

    if field.is_empty() {
        error.msg.clone()
    } else {
        format!("{field}: {}", error.msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_string() {
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, r#"{"detail": "Insufficient stock"}"#);
        assert!(matches!(
            &err,
            ApiError::Validation { status: 400, message } if message == "Insufficient stock"
        ));
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.user_message(), "Insufficient stock");
    }

    #[test]
    fn test_detail_field_list() {
        let body = r#"{"detail": [
            {"loc": ["body", "price"], "msg": "field required"},
            {"loc": ["body", "items", 0, "quantity"], "msg": "must be greater than 0"}
        ]}"#;
        let err = ApiError::from_status(StatusCode::UNPROCESSABLE_ENTITY, body);
        assert_eq!(
            err.to_string(),
            "Request rejected (422): price: field required; items.0.quantity: must be greater than 0"
        );
    }

    #[test]
    fn test_message_field() {
        let err = ApiError::from_status(StatusCode::NOT_FOUND, r#"{"message": "Product missing"}"#);
        assert_eq!(err.to_string(), "Request rejected (404): Product missing");
    }

    #[test]
    fn test_plain_text_body_is_truncated() {
        let body = "x".repeat(500);
        let err = ApiError::from_status(StatusCode::BAD_GATEWAY, &body);
        match err {
            ApiError::Server { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message.len(), MAX_MESSAGE_CHARS);
            }
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_body_uses_reason_phrase() {
        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, "");
        assert_eq!(err.to_string(), "Unauthorized: Unauthorized");
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn test_local_errors_have_no_status() {
        assert_eq!(ApiError::InvalidRequest("bad".into()).status(), None);
        assert_eq!(
            ApiError::Decode {
                message: "eof".into()
            }
            .status(),
            None
        );
    }
}
