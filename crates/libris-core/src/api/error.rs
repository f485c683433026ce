use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Coarse failure class, for callers that pick a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// No response was received.
    Network,
    /// 401 or 403.
    Authentication,
    /// Any other 4xx, or a request that could not be built.
    Validation,
    /// 5xx.
    Server,
    /// 2xx with a body that did not match the expected shape.
    Decode,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unable to reach the server. Check your connection and try again.")]
    Network(#[source] reqwest::Error),

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Access denied: {message}")]
    AccessDenied { message: String },

    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error("{message}")]
    Server {
        status: StatusCode,
        message: String,
        detail: String,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

const UNAUTHORIZED_FALLBACK: &str = "Authentication required";
const FORBIDDEN_FALLBACK: &str = "You do not have permission to perform this action";
const SERVER_MESSAGE: &str = "The server encountered an error. Please try again later.";

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Pull a human-readable message out of an error body.
    ///
    /// Accepts `{"message": ..}`, `{"error": ..}`, `{"msg": ..}` and the
    /// validator style `{"errors": [{"msg": ..}]}`.
    fn extract_message(body: &str) -> Option<String> {
        let value: Value = serde_json::from_str(body).ok()?;
        let direct = ["message", "error", "msg"]
            .iter()
            .find_map(|key| value.get(*key).and_then(Value::as_str));
        let message = match direct {
            Some(message) => message,
            None => value.get("errors")?.as_array()?.iter().find_map(|e| {
                e.get("msg")
                    .or_else(|| e.get("message"))
                    .and_then(Value::as_str)
            })?,
        };
        let message = message.trim();
        (!message.is_empty()).then(|| message.to_string())
    }

    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = Self::extract_message(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized {
                message: message.unwrap_or_else(|| UNAUTHORIZED_FALLBACK.to_string()),
            },
            403 => ApiError::AccessDenied {
                message: message.unwrap_or_else(|| FORBIDDEN_FALLBACK.to_string()),
            },
            400..=499 => ApiError::Rejected {
                status,
                message: message
                    .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16())),
            },
            500..=599 => ApiError::Server {
                status,
                message: SERVER_MESSAGE.to_string(),
                detail: Self::truncate_body(body),
            },
            _ => ApiError::InvalidResponse(format!(
                "Status {}: {}",
                status,
                Self::truncate_body(body)
            )),
        }
    }

    pub fn kind(&self) -> ApiErrorKind {
        match self {
            ApiError::Network(_) => ApiErrorKind::Network,
            ApiError::Unauthorized { .. } | ApiError::AccessDenied { .. } => {
                ApiErrorKind::Authentication
            }
            ApiError::Rejected { .. } | ApiError::InvalidRequest(_) => ApiErrorKind::Validation,
            ApiError::Server { .. } => ApiErrorKind::Server,
            ApiError::InvalidResponse(_) => ApiErrorKind::Decode,
        }
    }

    /// HTTP status, when a response was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED),
            ApiError::AccessDenied { .. } => Some(StatusCode::FORBIDDEN),
            ApiError::Rejected { status, .. } | ApiError::Server { status, .. } => Some(*status),
            ApiError::Network(e) => e.status(),
            ApiError::InvalidRequest(_) | ApiError::InvalidResponse(_) => None,
        }
    }

    /// Message suitable for showing to the user as-is.
    pub fn message(&self) -> String {
        match self {
            ApiError::Unauthorized { message }
            | ApiError::AccessDenied { message }
            | ApiError::Rejected { message, .. }
            | ApiError::Server { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }
}
