//! Gateway error taxonomy and HTTP status classification.

use reqwest::StatusCode;
use serde::Deserialize;

use crate::core_state::SessionError;
use crate::validation::ValidationErrors;

/// Endpoint used for administrative re-authentication. A 401 here means
/// "wrong password", never "session over".
pub const SECONDARY_AUTH_PATH: &str = "/auth/danger-zone-auth";

/// Errors surfaced by the API gateway and the endpoint modules.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Session expired")]
    SessionExpired,
    #[error("Rate limit exceeded")]
    RateLimited,
    #[error("Network error: {0}")]
    Network(String),
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Request failed ({status}): {message}")]
    RequestFailed { status: u16, message: String },
    #[error("Unexpected response: {0}")]
    Decode(String),
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ApiError {
    /// Timeouts are reported exactly like connection failures.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_))
    }

    /// Already shown to the user by the gateway (unless the request was silent).
    pub fn is_reported_globally(&self) -> bool {
        matches!(self, Self::SessionExpired | Self::RateLimited) || self.is_network()
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::SessionExpired => Some(401),
            Self::RateLimited => Some(429),
            Self::NotFound(_) => Some(404),
            Self::RequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message suitable for an error toast, falling back to `fallback`
    /// when the server gave nothing useful.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::RequestFailed { message, .. } | Self::NotFound(message)
                if !message.trim().is_empty() =>
            {
                message.clone()
            }
            Self::RateLimited => {
                "Too many requests. Please wait a moment before trying again.".to_string()
            }
            Self::Validation(errors) => errors.to_string(),
            _ => fallback.to_string(),
        }
    }
}

/// Shape of the backend's error body.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// Pull the human-readable message out of an error body.
pub(crate) fn extract_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        })
}

pub(crate) fn is_secondary_auth(path: &str) -> bool {
    path.split('?')
        .next()
        .is_some_and(|p| p.trim_end_matches('/').ends_with(SECONDARY_AUTH_PATH))
}

/// Map a non-2xx status to the taxonomy.
///
/// `credential_check` marks requests whose 401 means "bad credentials"
/// (login, danger-zone check) rather than an ended session.
pub(crate) fn classify_status(
    status: StatusCode,
    message: String,
    path: &str,
    credential_check: bool,
) -> ApiError {
    match status {
        StatusCode::UNAUTHORIZED if !credential_check && !is_secondary_auth(path) => {
            ApiError::SessionExpired
        }
        StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimited,
        StatusCode::NOT_FOUND => ApiError::NotFound(message),
        _ => ApiError::RequestFailed {
            status: status.as_u16(),
            message,
        },
    }
}
