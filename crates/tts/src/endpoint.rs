//! One configured TTS backend and its health state machine.
//!
//! Health, the circuit-open instant and the in-flight count live in atomics so that concurrent
//! requests update them without locking.

use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;

const HEALTHY: u8 = 0;
const TEMPORARY_FAILURE: u8 = 1;
const PERMANENT_FAILURE: u8 = 2;
const CLIENT_ERROR: u8 = 3;

/// No circuit is open.
const NOT_OPEN: i64 = i64::MIN;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EndpointHealth {
    Healthy,
    /// Down until the recovery window has passed.
    TemporaryFailure,
    /// Down until the operator fixes the configuration.
    PermanentFailure,
    /// Marked down after a request-level error; never recovered by the timer.
    ClientError,
}

impl EndpointHealth {
    fn from_u8(value: u8) -> Self {
        match value {
            HEALTHY => EndpointHealth::Healthy,
            TEMPORARY_FAILURE => EndpointHealth::TemporaryFailure,
            PERMANENT_FAILURE => EndpointHealth::PermanentFailure,
            _ => EndpointHealth::ClientError,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointHealth::Healthy => "HEALTHY",
            EndpointHealth::TemporaryFailure => "TEMPORARY_FAILURE",
            EndpointHealth::PermanentFailure => "PERMANENT_FAILURE",
            EndpointHealth::ClientError => "CLIENT_ERROR",
        }
    }
}

pub struct TtsEndpoint {
    id: String,
    api_key: String,
    base_url: String,
    health: AtomicU8,
    circuit_opened_at_ms: AtomicI64,
    in_flight: AtomicUsize,
}

impl fmt::Debug for TtsEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtsEndpoint")
            .field("id", &self.id)
            .field("base_url", &self.base_url)
            .field("health", &self.health())
            .field("in_flight", &self.in_flight())
            .finish_non_exhaustive()
    }
}

impl TtsEndpoint {
    pub fn new(id: impl Into<String>, api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            id: id.into(),
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            health: AtomicU8::new(HEALTHY),
            circuit_opened_at_ms: AtomicI64::new(NOT_OPEN),
            in_flight: AtomicUsize::new(0),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn health(&self) -> EndpointHealth {
        EndpointHealth::from_u8(self.health.load(Ordering::SeqCst))
    }

    pub fn is_healthy(&self) -> bool {
        self.health() == EndpointHealth::Healthy
    }

    /// When the circuit opened (millis), if it is open.
    pub fn circuit_opened_at_ms(&self) -> Option<i64> {
        match self.circuit_opened_at_ms.load(Ordering::SeqCst) {
            NOT_OPEN => None,
            at => Some(at),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Counts a request as in flight until the returned guard is dropped.
    pub fn begin_request(self: &Arc<Self>) -> InFlightGuard {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        InFlightGuard {
            endpoint: Arc::clone(self),
        }
    }

    fn end_request(&self) {
        // Never below zero.
        let _ = self
            .in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    /// Back to healthy; returns the previous health.
    pub fn mark_healthy(&self) -> EndpointHealth {
        let previous = self.health.swap(HEALTHY, Ordering::SeqCst);
        self.circuit_opened_at_ms.store(NOT_OPEN, Ordering::SeqCst);
        EndpointHealth::from_u8(previous)
    }

    /// Opens the circuit at `now_ms`; returns the previous health.
    ///
    /// A permanently failed endpoint stays permanently failed.
    pub fn mark_temporary_failure(&self, now_ms: i64) -> EndpointHealth {
        self.circuit_opened_at_ms.store(now_ms, Ordering::SeqCst);
        let previous = self
            .health
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |h| {
                (h != PERMANENT_FAILURE).then_some(TEMPORARY_FAILURE)
            })
            .unwrap_or_else(|h| h);
        EndpointHealth::from_u8(previous)
    }

    /// Returns true only for the call that moved the endpoint into permanent failure.
    pub fn mark_permanent_failure(&self, now_ms: i64) -> bool {
        self.circuit_opened_at_ms.store(now_ms, Ordering::SeqCst);
        self.health.swap(PERMANENT_FAILURE, Ordering::SeqCst) != PERMANENT_FAILURE
    }

    /// Returns the previous health. A permanently failed endpoint stays permanently failed.
    pub fn mark_client_error(&self, now_ms: i64) -> EndpointHealth {
        self.circuit_opened_at_ms.store(now_ms, Ordering::SeqCst);
        let previous = self
            .health
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |h| {
                (h != PERMANENT_FAILURE).then_some(CLIENT_ERROR)
            })
            .unwrap_or_else(|h| h);
        EndpointHealth::from_u8(previous)
    }

    /// Flips a temporarily failed endpoint back to healthy if its circuit has been open for at
    /// least `window_ms`. Returns true if this call recovered it.
    pub fn try_recover(&self, now_ms: i64, window_ms: i64) -> bool {
        if self.health.load(Ordering::SeqCst) != TEMPORARY_FAILURE {
            return false;
        }
        let Some(opened_at) = self.circuit_opened_at_ms() else {
            return false;
        };
        if now_ms.saturating_sub(opened_at) < window_ms {
            return false;
        }
        let recovered = self
            .health
            .compare_exchange(TEMPORARY_FAILURE, HEALTHY, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if recovered {
            self.circuit_opened_at_ms.store(NOT_OPEN, Ordering::SeqCst);
        }
        recovered
    }
}

/// Decrements the endpoint's in-flight count when dropped, including on cancellation.
#[derive(Debug)]
pub struct InFlightGuard {
    endpoint: Arc<TtsEndpoint>,
}

impl InFlightGuard {
    pub fn endpoint(&self) -> &Arc<TtsEndpoint> {
        &self.endpoint
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.endpoint.end_request();
    }
}
