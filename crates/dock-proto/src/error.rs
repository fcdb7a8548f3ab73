use std::time::Duration;

use thiserror::Error;

/// Terminal failure of a REST call.
///
/// Only `Network` is retried by the client core. `Offline` and `Timeout`
/// have already been announced to the user by the time the caller sees them;
/// every other variant is left to the calling view.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// No attempt was made because the client is offline.
    #[error("offline")]
    Offline,
    /// The in-flight request was cancelled after the timeout budget.
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    /// Transport-level failure (connect refused, reset, unreadable body).
    #[error("network error: {0}")]
    Network(String),
    /// 2xx response whose body did not match the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),
    /// Rejected client-side before any request was sent.
    #[error("{0}")]
    InvalidRequest(String),
}

impl ApiError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// True when the client core already showed a notification for this error.
    pub fn already_notified(&self) -> bool {
        matches!(self, Self::Offline | Self::Timeout(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short human-readable reason, preferring the server's `detail` field
    /// when the error body is a JSON object carrying one.
    pub fn user_message(&self) -> String {
        match self {
            Self::Http { status, body } => {
                let detail = serde_json::from_str::<serde_json::Value>(body)
                    .ok()
                    .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string));
                match detail {
                    Some(d) => d,
                    None if body.is_empty() => format!("server returned {}", status),
                    None => body.clone(),
                }
            }
            other => other.to_string(),
        }
    }
}
