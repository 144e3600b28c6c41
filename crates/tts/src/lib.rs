//! # TTS
//!
//! Streams synthesized speech from one of several interchangeable backend endpoints.
//!
//! ## Modules
//!
//! - [`voice`] - Voice, VoiceSettings, VoiceStyle, AudioFormat
//! - [`error`] - TtsError
//! - [`classifier`] - Maps a [`TtsError`] to a [`FailureKind`]
//! - [`endpoint`] - Per-endpoint health state machine and in-flight counter (lock-free)
//! - [`event`] - Failure events for permanently broken endpoints and their sinks
//! - [`load_balancer`] - Health-aware least-loaded selection with timed recovery
//! - [`client`] - The [`TtsClient`] port and [`LoadBalancedTtsClient`] (HTTP)
//! - [`config`] - Env-based [`TtsConfig`]
//!
//! ## External interactions
//!
//! - **TTS provider HTTP API**: `POST /v1/text-to-speech/{voice_id}/stream`, `GET /v1/credits` (warm-up)

pub mod classifier;
pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod event;
pub mod load_balancer;
pub mod voice;

pub use classifier::{classify, FailureKind};
pub use client::{AudioStream, LoadBalancedTtsClient, TtsClient};
pub use config::{EndpointConfig, TtsConfig};
pub use endpoint::{EndpointHealth, InFlightGuard, TtsEndpoint};
pub use error::TtsError;
pub use event::{FailureEventSink, LoggingFailureSink, TtsEndpointFailureEvent};
pub use load_balancer::{EndpointSnapshot, LoadBalancerConfig, TtsLoadBalancer};
pub use voice::{AudioFormat, Voice, VoiceSettings, VoiceStyle};
