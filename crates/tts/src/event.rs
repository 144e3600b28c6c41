//! Operator-facing events for endpoints that stop working permanently.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::error;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TtsEndpointFailureEvent {
    pub endpoint_id: String,
    pub error_type: String,
    pub error_message: String,
    pub occurred_at: DateTime<Utc>,
}

/// Receives failure events. Called on the request path, so implementations must not block.
pub trait FailureEventSink: Send + Sync {
    fn publish(&self, event: TtsEndpointFailureEvent);
}

/// Logs each event at error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingFailureSink;

impl FailureEventSink for LoggingFailureSink {
    fn publish(&self, event: TtsEndpointFailureEvent) {
        error!(
            endpoint_id = %event.endpoint_id,
            error_type = %event.error_type,
            error_message = %event.error_message,
            occurred_at = %event.occurred_at,
            "TTS endpoint permanently failed; operator action required"
        );
    }
}
