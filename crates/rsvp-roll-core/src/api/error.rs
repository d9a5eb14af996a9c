use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// 401/403: Meetup hides RSVPs of members-only groups from anonymous callers.
    #[error("Group is private or RSVPs are hidden: {0}")]
    PrivateGroup(String),

    /// 404: unknown group urlname or event id.
    #[error("Group or event not found: {0}")]
    NotFound(String),

    /// 410: the event was deleted after it was listed.
    #[error("Event no longer exists: {0}")]
    EventGone(String),

    #[error("Rate limited by Meetup")]
    RateLimited,

    #[error("Meetup server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Meetup's error envelope: `{"errors":[{"code":"...","message":"..."}]}`
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    code: String,
    #[serde(default)]
    message: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Summarise an error body, preferring Meetup's `code: message` pairs
    /// over the raw text.
    fn describe_body(body: &str) -> String {
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) if !envelope.errors.is_empty() => {
                let details: Vec<String> = envelope
                    .errors
                    .into_iter()
                    .map(|e| match e.message {
                        Some(message) => format!("{}: {}", e.code, message),
                        None => e.code,
                    })
                    .collect();
                Self::truncate_body(&details.join("; "))
            }
            _ => Self::truncate_body(body),
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let detail = Self::describe_body(body);
        match status.as_u16() {
            401 | 403 => ApiError::PrivateGroup(detail),
            404 => ApiError::NotFound(detail),
            410 => ApiError::EventGone(detail),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(detail),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, detail)),
        }
    }
}
