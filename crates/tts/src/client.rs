//! The TTS port and its load-balanced HTTP implementation.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::future::join_all;
use futures::stream::{self, BoxStream, Stream, StreamExt, TryStreamExt};
use serde::Serialize;
use tokio::time::{sleep, Instant, Sleep};
use tracing::{debug, info, instrument, warn};

use crate::classifier::classify;
use crate::endpoint::{InFlightGuard, TtsEndpoint};
use crate::error::TtsError;
use crate::load_balancer::TtsLoadBalancer;
use crate::voice::Voice;

/// Audio chunks of one synthesis, in order.
pub type AudioStream = BoxStream<'static, Result<Bytes, TtsError>>;

/// Attempts per synthesis: the first endpoint plus one retry elsewhere.
const MAX_ATTEMPTS: usize = 2;

const API_KEY_HEADER: &str = "x-sup-api-key";

/// TTS port.
#[async_trait]
pub trait TtsClient: Send + Sync {
    /// Lazily starts synthesis of `text` when the stream is first polled. Dropping the stream cancels it.
    fn stream_synthesize(&self, text: &str) -> AudioStream;

    /// Whole audio for `text`.
    async fn synthesize(&self, text: &str) -> Result<Bytes, TtsError> {
        let chunks: Vec<Bytes> = self.stream_synthesize(text).try_collect().await?;
        let mut audio = BytesMut::with_capacity(chunks.iter().map(|c| c.len()).sum());
        for chunk in chunks {
            audio.extend_from_slice(&chunk);
        }
        Ok(audio.freeze())
    }

    /// Best-effort warm-up of connections. Callers treat an error as degraded, never fatal.
    async fn prepare(&self) -> Result<(), TtsError>;
}

#[derive(Debug, Serialize)]
struct VoiceSettingsBody {
    pitch_shift: i32,
    pitch_variance: f64,
    speed: f64,
}

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    language: &'a str,
    style: &'a str,
    output_format: &'a str,
    voice_settings: VoiceSettingsBody,
    include_phonemes: bool,
}

/// [`TtsClient`] that spreads requests over the endpoints of a [`TtsLoadBalancer`].
///
/// Every failure is reported to the balancer. A failure before the first audio chunk, including
/// a body that breaks or stalls before delivering any bytes, is retried once on another endpoint
/// unless it is a client error. Once audio has been delivered, errors go to the caller.
#[derive(Clone)]
pub struct LoadBalancedTtsClient {
    http: reqwest::Client,
    balancer: Arc<TtsLoadBalancer>,
    voice: Arc<Voice>,
    request_timeout: Duration,
    warmup_timeout: Duration,
}

impl LoadBalancedTtsClient {
    pub fn new(balancer: Arc<TtsLoadBalancer>, voice: Voice) -> Self {
        Self {
            http: reqwest::Client::new(),
            balancer,
            voice: Arc::new(voice),
            request_timeout: Duration::from_secs(10),
            warmup_timeout: Duration::from_secs(2),
        }
    }

    /// Time allowed until response headers arrive, and between two body chunks.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_warmup_timeout(mut self, timeout: Duration) -> Self {
        self.warmup_timeout = timeout;
        self
    }

    pub fn balancer(&self) -> &Arc<TtsLoadBalancer> {
        &self.balancer
    }

    pub fn voice(&self) -> &Voice {
        &self.voice
    }

    fn stream_url(&self, endpoint: &TtsEndpoint) -> String {
        format!(
            "{}/v1/text-to-speech/{}/stream",
            endpoint.base_url(),
            self.voice.id
        )
    }

    /// Sends the request to one endpoint and checks the status.
    async fn send(&self, endpoint: &TtsEndpoint, text: &str) -> Result<reqwest::Response, TtsError> {
        let body = SynthesisRequest {
            text,
            language: &self.voice.language,
            style: self.voice.style.as_str(),
            output_format: self.voice.output_format.as_str(),
            voice_settings: VoiceSettingsBody {
                pitch_shift: self.voice.settings.pitch_shift,
                pitch_variance: self.voice.settings.pitch_variance,
                speed: self.voice.settings.speed,
            },
            include_phonemes: false,
        };

        let request = self
            .http
            .post(self.stream_url(endpoint))
            .header(API_KEY_HEADER, endpoint.api_key())
            .json(&body)
            .send();

        let response = tokio::time::timeout(self.request_timeout, request)
            .await
            .map_err(|_| {
                TtsError::Timeout(format!(
                    "no response within {} ms",
                    self.request_timeout.as_millis()
                ))
            })??;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(TtsError::Http {
                status: status.as_u16(),
                body,
            })
        }
    }

    /// Opens an audio stream, retrying once on another endpoint unless the failure is a client error.
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    async fn open(&self, text: String) -> Result<EndpointAudioStream, TtsError> {
        let mut tried: Vec<String> = Vec::with_capacity(MAX_ATTEMPTS);
        let mut last_error = TtsError::NoEndpoints;

        for attempt in 1..=MAX_ATTEMPTS {
            let endpoint = {
                let exclude: Vec<&str> = tried.iter().map(String::as_str).collect();
                self.balancer.select_endpoint_excluding(&exclude)
            };
            let guard = endpoint.begin_request();
            debug!(
                endpoint_id = %endpoint.id(),
                attempt,
                in_flight = endpoint.in_flight(),
                "step: TTS request"
            );

            let response = match self.send(&endpoint, &text).await {
                Ok(response) => response,
                Err(error) => {
                    drop(guard);
                    let kind = self.balancer.report_failure(&endpoint, &error);
                    if !kind.is_retryable() {
                        return Err(error);
                    }
                    tried.push(endpoint.id().to_string());
                    last_error = error;
                    continue;
                }
            };

            let mut audio = EndpointAudioStream::new(
                response,
                guard,
                Arc::clone(&self.balancer),
                self.request_timeout,
            );
            match audio.next().await {
                Some(Err(error)) => {
                    if !classify(&error).is_retryable() {
                        return Err(error);
                    }
                    tried.push(endpoint.id().to_string());
                    last_error = error;
                }
                first => {
                    audio.buffered = first.and_then(Result::ok);
                    return Ok(audio);
                }
            }
        }

        warn!(attempts = MAX_ATTEMPTS, error = %last_error, "All TTS endpoints exhausted");
        Err(TtsError::Exhausted {
            attempts: MAX_ATTEMPTS,
            last: Box::new(last_error),
        })
    }

    async fn ping(&self, endpoint: &TtsEndpoint) -> Result<u16, TtsError> {
        let request = self
            .http
            .get(format!("{}/v1/credits", endpoint.base_url()))
            .header(API_KEY_HEADER, endpoint.api_key())
            .send();
        let response = tokio::time::timeout(self.warmup_timeout, request)
            .await
            .map_err(|_| TtsError::Timeout("warm-up".to_string()))??;
        Ok(response.status().as_u16())
    }
}

#[async_trait]
impl TtsClient for LoadBalancedTtsClient {
    fn stream_synthesize(&self, text: &str) -> AudioStream {
        let client = self.clone();
        let text = text.to_string();
        stream::once(async move { client.open(text).await })
            .try_flatten()
            .boxed()
    }

    /// Pings every endpoint once. Fails only if none of them answered; health is never touched.
    async fn prepare(&self) -> Result<(), TtsError> {
        let pings = self.balancer.endpoints().iter().map(|endpoint| async move {
            let result = self.ping(endpoint).await;
            match &result {
                Ok(status) => debug!(endpoint_id = %endpoint.id(), status, "TTS warm-up ping"),
                Err(e) => debug!(endpoint_id = %endpoint.id(), error = %e, "TTS warm-up ping failed"),
            }
            result
        });
        let results = join_all(pings).await;
        let reached = results.iter().filter(|r| r.is_ok()).count();
        info!(endpoints = results.len(), reached, "TTS warm-up done");

        match results.into_iter().find_map(Result::err) {
            Some(error) if reached == 0 => Err(error),
            _ => Ok(()),
        }
    }
}

/// Response body of one endpoint. Holds the in-flight guard until the body ends, fails or the
/// stream is dropped. Waiting longer than `idle_timeout` for the next chunk is a timeout failure.
struct EndpointAudioStream {
    inner: BoxStream<'static, reqwest::Result<Bytes>>,
    buffered: Option<Bytes>,
    idle: Pin<Box<Sleep>>,
    idle_timeout: Duration,
    guard: Option<InFlightGuard>,
    balancer: Arc<TtsLoadBalancer>,
}

impl EndpointAudioStream {
    fn new(
        response: reqwest::Response,
        guard: InFlightGuard,
        balancer: Arc<TtsLoadBalancer>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            inner: response.bytes_stream().boxed(),
            buffered: None,
            idle: Box::pin(sleep(idle_timeout)),
            idle_timeout,
            guard: Some(guard),
            balancer,
        }
    }

    /// Releases the endpoint and reports the failure once.
    fn fail(&mut self, error: TtsError) -> TtsError {
        if let Some(guard) = self.guard.take() {
            let endpoint = Arc::clone(guard.endpoint());
            drop(guard);
            self.balancer.report_failure(&endpoint, &error);
        }
        error
    }
}

impl Stream for EndpointAudioStream {
    type Item = Result<Bytes, TtsError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if let Some(chunk) = this.buffered.take() {
            return Poll::Ready(Some(Ok(chunk)));
        }
        if this.guard.is_none() {
            return Poll::Ready(None);
        }
        match this.inner.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                let deadline = Instant::now() + this.idle_timeout;
                this.idle.as_mut().reset(deadline);
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(this.fail(TtsError::from(e))))),
            Poll::Ready(None) => {
                if let Some(guard) = this.guard.take() {
                    let endpoint = Arc::clone(guard.endpoint());
                    drop(guard);
                    this.balancer.report_success(&endpoint);
                }
                Poll::Ready(None)
            }
            Poll::Pending => {
                if this.idle.as_mut().poll(cx).is_pending() {
                    return Poll::Pending;
                }
                let error = TtsError::Timeout(format!(
                    "no audio within {} ms",
                    this.idle_timeout.as_millis()
                ));
                Poll::Ready(Some(Err(this.fail(error))))
            }
        }
    }
}
