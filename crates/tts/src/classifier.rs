//! Failure classification for TTS calls.

use serde::Serialize;

use crate::error::TtsError;

/// How a failed call affects its endpoint and the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// Capacity or availability problem; the endpoint recovers after a cool-down and the request may be retried elsewhere.
    Temporary,
    /// Auth, billing or configuration problem; the endpoint stays out of rotation.
    Permanent,
    /// The request itself is bad; retrying elsewhere cannot help.
    ClientError,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Temporary => "TEMPORARY_FAILURE",
            FailureKind::Permanent => "PERMANENT_FAILURE",
            FailureKind::ClientError => "CLIENT_ERROR",
        }
    }

    pub fn is_retryable(&self) -> bool {
        !matches!(self, FailureKind::ClientError)
    }
}

/// 400/404 → client error; 401/402/403 → permanent; 408/429/5xx → temporary; other 4xx → permanent.
/// Timeouts, connection and decode errors are temporary.
pub fn classify(error: &TtsError) -> FailureKind {
    match error {
        TtsError::Http { status, .. } => classify_status(*status),
        TtsError::Timeout(_) | TtsError::Connection(_) | TtsError::Decode(_) => {
            FailureKind::Temporary
        }
        TtsError::Exhausted { last, .. } => classify(last),
        TtsError::NoEndpoints | TtsError::Config(_) => FailureKind::Permanent,
    }
}

fn classify_status(status: u16) -> FailureKind {
    match status {
        400 | 404 => FailureKind::ClientError,
        401 | 402 | 403 => FailureKind::Permanent,
        408 | 429 => FailureKind::Temporary,
        s if s >= 500 => FailureKind::Temporary,
        s if (400..500).contains(&s) => FailureKind::Permanent,
        _ => FailureKind::Temporary,
    }
}
