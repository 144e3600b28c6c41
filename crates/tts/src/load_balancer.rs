//! Health-aware endpoint selection.
//!
//! Among healthy endpoints the least loaded wins; ties rotate through a shared cursor.
//! Temporarily failed endpoints are recovered on access, at most once per check interval.

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dialogue_core::Clock;
use serde::Serialize;
use tracing::{info, warn};

use crate::classifier::{classify, FailureKind};
use crate::endpoint::{EndpointHealth, TtsEndpoint};
use crate::error::TtsError;
use crate::event::{FailureEventSink, TtsEndpointFailureEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadBalancerConfig {
    /// How long a temporarily failed endpoint stays out of rotation.
    pub recovery_window: Duration,
    /// Minimum time between two recovery sweeps.
    pub recovery_check_interval: Duration,
}

impl Default for LoadBalancerConfig {
    fn default() -> Self {
        Self {
            recovery_window: Duration::from_secs(30),
            recovery_check_interval: Duration::from_secs(10),
        }
    }
}

/// Point-in-time view of one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointSnapshot {
    pub id: String,
    pub health: EndpointHealth,
    pub in_flight: usize,
}

pub struct TtsLoadBalancer {
    endpoints: Vec<Arc<TtsEndpoint>>,
    cursor: AtomicUsize,
    last_recovery_check_ms: AtomicI64,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn FailureEventSink>,
    config: LoadBalancerConfig,
}

fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

impl TtsLoadBalancer {
    pub fn new(
        endpoints: Vec<TtsEndpoint>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn FailureEventSink>,
        config: LoadBalancerConfig,
    ) -> Result<Self, TtsError> {
        if endpoints.is_empty() {
            return Err(TtsError::NoEndpoints);
        }
        let now_ms = clock.now_millis();
        info!(
            endpoints = endpoints.len(),
            recovery_window_secs = config.recovery_window.as_secs(),
            recovery_check_interval_secs = config.recovery_check_interval.as_secs(),
            "TTS load balancer initialized"
        );
        Ok(Self {
            endpoints: endpoints.into_iter().map(Arc::new).collect(),
            cursor: AtomicUsize::new(0),
            last_recovery_check_ms: AtomicI64::new(now_ms),
            clock,
            sink,
            config,
        })
    }

    pub fn endpoints(&self) -> &[Arc<TtsEndpoint>] {
        &self.endpoints
    }

    pub fn snapshot(&self) -> Vec<EndpointSnapshot> {
        self.endpoints
            .iter()
            .map(|e| EndpointSnapshot {
                id: e.id().to_string(),
                health: e.health(),
                in_flight: e.in_flight(),
            })
            .collect()
    }

    /// Picks an endpoint for the next request.
    pub fn select_endpoint(&self) -> Arc<TtsEndpoint> {
        self.select_endpoint_excluding(&[])
    }

    /// Like [`Self::select_endpoint`] but skips endpoints whose id is in `exclude`, unless
    /// nothing else is configured.
    ///
    /// Falls back to the first non-excluded endpoint when none is healthy.
    pub fn select_endpoint_excluding(&self, exclude: &[&str]) -> Arc<TtsEndpoint> {
        self.maybe_recover();

        let candidates: Vec<&Arc<TtsEndpoint>> = self
            .endpoints
            .iter()
            .filter(|e| !exclude.contains(&e.id()))
            .collect();
        let candidates = if candidates.is_empty() {
            self.endpoints.iter().collect()
        } else {
            candidates
        };

        let healthy: Vec<&Arc<TtsEndpoint>> =
            candidates.iter().copied().filter(|e| e.is_healthy()).collect();

        let Some(min_load) = healthy.iter().map(|e| e.in_flight()).min() else {
            let fallback = Arc::clone(candidates[0]);
            warn!(
                endpoint_id = %fallback.id(),
                "No healthy TTS endpoint; falling back to first configured endpoint"
            );
            return fallback;
        };

        let tied: Vec<&Arc<TtsEndpoint>> = healthy
            .into_iter()
            .filter(|e| e.in_flight() == min_load)
            .collect();
        if tied.is_empty() {
            // Load changed between the two reads; any candidate will do.
            return Arc::clone(candidates[0]);
        }
        let index = self.cursor.fetch_add(1, Ordering::SeqCst) % tied.len();
        Arc::clone(tied[index])
    }

    /// Optimistic recovery: any non-healthy endpoint that just served a request is healthy again.
    pub fn report_success(&self, endpoint: &TtsEndpoint) {
        let previous = endpoint.mark_healthy();
        if previous != EndpointHealth::Healthy {
            info!(
                endpoint_id = %endpoint.id(),
                previous = previous.as_str(),
                "TTS endpoint recovered after successful request"
            );
        }
    }

    /// Classifies `error`, updates the endpoint's health and returns the classification.
    pub fn report_failure(&self, endpoint: &TtsEndpoint, error: &TtsError) -> FailureKind {
        let kind = classify(error);
        let now_ms = self.clock.now_millis();
        warn!(
            endpoint_id = %endpoint.id(),
            failure = kind.as_str(),
            error = %error,
            "TTS endpoint request failed"
        );
        match kind {
            FailureKind::Temporary => {
                endpoint.mark_temporary_failure(now_ms);
            }
            FailureKind::Permanent => {
                if endpoint.mark_permanent_failure(now_ms) {
                    self.sink.publish(TtsEndpointFailureEvent {
                        endpoint_id: endpoint.id().to_string(),
                        error_type: kind.as_str().to_string(),
                        error_message: error.to_string(),
                        occurred_at: self.clock.now(),
                    });
                }
            }
            FailureKind::ClientError => {
                endpoint.mark_client_error(now_ms);
            }
        }
        kind
    }

    /// Recovers expired temporary failures if the check interval has elapsed.
    fn maybe_recover(&self) {
        let now_ms = self.clock.now_millis();
        let last = self.last_recovery_check_ms.load(Ordering::SeqCst);
        if now_ms.saturating_sub(last) < millis(self.config.recovery_check_interval) {
            return;
        }
        // One caller per interval performs the sweep.
        if self
            .last_recovery_check_ms
            .compare_exchange(last, now_ms, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        let window_ms = millis(self.config.recovery_window);
        for endpoint in &self.endpoints {
            if endpoint.try_recover(now_ms, window_ms) {
                info!(endpoint_id = %endpoint.id(), "TTS endpoint recovered after cool-down");
            }
        }
    }
}
