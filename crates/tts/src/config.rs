//! TTS configuration loaded from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::endpoint::TtsEndpoint;
use crate::error::TtsError;
use crate::load_balancer::LoadBalancerConfig;
use crate::voice::{AudioFormat, Voice, VoiceSettings, VoiceStyle};

pub const DEFAULT_BASE_URL: &str = "https://supertoneapi.com";

/// One backend as written in `TTS_ENDPOINTS`.
#[derive(Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    pub id: String,
    pub api_key: String,
    pub base_url: String,
}

impl std::fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("id", &self.id)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl FromStr for EndpointConfig {
    type Err = TtsError;

    /// Parses `id|api_key[|base_url]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('|').map(str::trim);
        let id = parts.next().unwrap_or_default();
        let api_key = parts.next().unwrap_or_default();
        let base_url = parts.next().filter(|u| !u.is_empty()).unwrap_or(DEFAULT_BASE_URL);
        if parts.next().is_some() {
            return Err(TtsError::Config(format!("too many fields in endpoint '{}'", id)));
        }
        if id.is_empty() || api_key.is_empty() {
            return Err(TtsError::Config(
                "endpoint must be written as id|api_key[|base_url]".to_string(),
            ));
        }
        Ok(Self {
            id: id.to_string(),
            api_key: api_key.to_string(),
            base_url: base_url.to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct TtsConfig {
    pub endpoints: Vec<EndpointConfig>,
    pub voice: Voice,
    pub load_balancer: LoadBalancerConfig,
    pub request_timeout: Duration,
    pub warmup_timeout: Duration,
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn parse_var<T: FromStr>(key: &str, default: T) -> Result<T, TtsError> {
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| TtsError::Config(format!("{} has an invalid value: {}", key, raw))),
        None => Ok(default),
    }
}

fn secs_var(key: &str, default: u64) -> Result<Duration, TtsError> {
    parse_var(key, default).map(Duration::from_secs)
}

impl TtsConfig {
    pub fn from_env() -> Result<Self, TtsError> {
        let endpoints = var("TTS_ENDPOINTS")
            .ok_or(TtsError::NoEndpoints)?
            .split(',')
            .filter(|entry| !entry.trim().is_empty())
            .map(EndpointConfig::from_str)
            .collect::<Result<Vec<_>, _>>()?;

        let defaults = Voice::default();
        let settings_defaults = VoiceSettings::default();
        let voice = Voice {
            id: var("TTS_VOICE_ID").unwrap_or(defaults.id),
            name: var("TTS_VOICE_NAME").unwrap_or(defaults.name),
            provider: var("TTS_PROVIDER").unwrap_or(defaults.provider),
            settings: VoiceSettings {
                pitch_shift: parse_var("TTS_PITCH_SHIFT", settings_defaults.pitch_shift)?,
                pitch_variance: parse_var("TTS_PITCH_VARIANCE", settings_defaults.pitch_variance)?,
                speed: parse_var("TTS_SPEED", settings_defaults.speed)?,
            },
            language: var("TTS_LANGUAGE").unwrap_or(defaults.language),
            style: var("TTS_STYLE")
                .map(|s| VoiceStyle::from_str_lossy(&s))
                .unwrap_or(defaults.style),
            output_format: match var("TTS_OUTPUT_FORMAT") {
                Some(raw) => raw.parse::<AudioFormat>()?,
                None => defaults.output_format,
            },
        };

        let lb_defaults = LoadBalancerConfig::default();
        let config = Self {
            endpoints,
            voice,
            load_balancer: LoadBalancerConfig {
                recovery_window: secs_var(
                    "TTS_RECOVERY_WINDOW_SECS",
                    lb_defaults.recovery_window.as_secs(),
                )?,
                recovery_check_interval: secs_var(
                    "TTS_RECOVERY_CHECK_INTERVAL_SECS",
                    lb_defaults.recovery_check_interval.as_secs(),
                )?,
            },
            request_timeout: secs_var("TTS_REQUEST_TIMEOUT_SECS", 10)?,
            warmup_timeout: secs_var("TTS_WARMUP_TIMEOUT_SECS", 2)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), TtsError> {
        if self.endpoints.is_empty() {
            return Err(TtsError::NoEndpoints);
        }
        for (i, endpoint) in self.endpoints.iter().enumerate() {
            if self.endpoints[..i].iter().any(|e| e.id == endpoint.id) {
                return Err(TtsError::Config(format!("duplicate endpoint id: {}", endpoint.id)));
            }
        }
        if self.request_timeout.is_zero() {
            return Err(TtsError::Config("TTS_REQUEST_TIMEOUT_SECS must be > 0".to_string()));
        }
        self.voice.validate()
    }

    pub fn build_endpoints(&self) -> Vec<TtsEndpoint> {
        self.endpoints
            .iter()
            .map(|e| TtsEndpoint::new(&e.id, &e.api_key, &e.base_url))
            .collect()
    }
}
