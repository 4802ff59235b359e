use thiserror::Error;

/// Failure of a remote store operation.
///
/// The sync engine only distinguishes duplicate rejections from everything
/// else; see [`GatewayError::is_duplicate`].
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Remote store not configured")]
    Unconfigured,

    #[error("Remote store unavailable: {0}")]
    Unavailable(String),

    #[error("Rejected by remote store: {message}")]
    Rejected { duplicate: bool, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// PostgreSQL `unique_violation`.
const UNIQUE_VIOLATION_CODE: &str = "23505";

/// Message fragments backends use for uniqueness violations, lowercase.
const DUPLICATE_PATTERNS: &[&str] = &[
    "duplicate key",
    "unique constraint",
    "already registered",
    "já registrad",
];

impl GatewayError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, GatewayError::Rejected { duplicate: true, .. })
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        let message = message.into();
        GatewayError::Rejected {
            duplicate: message_is_duplicate(&message),
            message,
        }
    }

    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
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

    /// Classify a failed HTTP response.
    ///
    /// A duplicate signal in the body wins over the status.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        if body_is_duplicate(body) {
            return GatewayError::Rejected {
                duplicate: true,
                message: truncated,
            };
        }
        match status.as_u16() {
            401 | 403 => GatewayError::Rejected {
                duplicate: false,
                message: format!("Access denied: {}", truncated),
            },
            408 | 429 => GatewayError::Unavailable(format!("Status {}: {}", status, truncated)),
            500..=599 => {
                GatewayError::Unavailable(format!("Server error {}: {}", status, truncated))
            }
            _ => GatewayError::Rejected {
                duplicate: false,
                message: format!("Status {}: {}", status, truncated),
            },
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GatewayError::Unavailable(format!("Request timed out: {}", e))
        } else if e.is_decode() {
            GatewayError::InvalidResponse(e.to_string())
        } else {
            GatewayError::Unavailable(e.to_string())
        }
    }
}

pub(crate) fn message_is_duplicate(message: &str) -> bool {
    let lower = message.to_lowercase();
    DUPLICATE_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Look for a duplicate signal in a JSON error body (`code`, `message`,
/// `details`) and fall back to scanning the raw text.
fn body_is_duplicate(body: &str) -> bool {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if value.get("code").and_then(|c| c.as_str()) == Some(UNIQUE_VIOLATION_CODE) {
            return true;
        }
        return ["message", "details", "error"]
            .iter()
            .filter_map(|k| value.get(*k).and_then(|v| v.as_str()))
            .any(message_is_duplicate);
    }
    message_is_duplicate(body)
}
