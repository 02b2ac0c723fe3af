//! Error type for chat requests and helpers for mapping HTTP failures.

use std::time::Duration;

/// Errors from a chat-send operation.
///
/// Malformed event payloads are not represented here: they are skipped by the
/// consumer and never abort a stream.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// No API credential was configured. Raised before any network call.
    #[error("missing credential: {0}")]
    MissingCredential(String),
    /// The completion endpoint rejected the credential.
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// The completion endpoint is throttling this client.
    #[error("rate limited: {0}")]
    RateLimited(String),
    /// The completion endpoint returned a server-side failure.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Any other non-success status. `body` is the drained response text.
    #[error("HTTP {status}: {body}")]
    Status {
        /// Numeric HTTP status code.
        status: u16,
        /// Response body, read in full.
        body: String,
    },
    /// Connection-level failure (DNS, reset, TLS).
    #[error("network error: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// The request timed out. Carries the configured limit when one was set
    /// on the [`ChatConfig`](crate::ChatConfig).
    #[error(
        "request timed out{}",
        .0.map(|limit| format!(" after {limit:?}")).unwrap_or_default()
    )]
    Timeout(Option<Duration>),
    /// The response body failed mid-read after streaming began.
    #[error("stream error: {0}")]
    Stream(String),
    /// The caller's cancellation token fired. No partial result is returned.
    #[error("cancelled")]
    Cancelled,
}

impl ChatError {
    /// Whether a caller-side retry is likely to succeed.
    ///
    /// This component never retries on its own.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited(_)
                | Self::ServiceUnavailable(_)
                | Self::Network(_)
                | Self::Timeout(_)
                | Self::Stream(_)
        )
    }
}

/// Map a non-success HTTP status and its drained body to a [`ChatError`].
pub(crate) fn map_http_status(status: reqwest::StatusCode, body: &str) -> ChatError {
    match status.as_u16() {
        401 | 403 => ChatError::Authentication(body.to_string()),
        429 => ChatError::RateLimited(body.to_string()),
        500..=599 => ChatError::ServiceUnavailable(body.to_string()),
        code => ChatError::Status {
            status: code,
            body: body.to_string(),
        },
    }
}

/// Map a [`reqwest::Error`] to a [`ChatError`]. `timeout` is the limit the
/// request was sent with, if any.
pub(crate) fn map_reqwest_error(err: reqwest::Error, timeout: Option<Duration>) -> ChatError {
    if err.is_timeout() {
        ChatError::Timeout(timeout)
    } else {
        ChatError::Network(Box::new(err))
    }
}

/// Map a failure while reading the streamed body. Timeouts keep their own
/// variant; everything else becomes [`ChatError::Stream`].
pub(crate) fn map_body_error(err: reqwest::Error, timeout: Option<Duration>) -> ChatError {
    if err.is_timeout() {
        ChatError::Timeout(timeout)
    } else {
        ChatError::Stream(err.to_string())
    }
}
