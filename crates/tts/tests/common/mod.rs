//! Shared fixtures for TTS tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use dialogue_core::{Clock, ManualClock};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tts::{FailureEventSink, LoadBalancerConfig, TtsEndpoint, TtsEndpointFailureEvent, TtsLoadBalancer};

/// Records every published event.
#[derive(Default)]
pub struct CollectingSink {
    events: Mutex<Vec<TtsEndpointFailureEvent>>,
}

impl CollectingSink {
    pub fn events(&self) -> Vec<TtsEndpointFailureEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl FailureEventSink for CollectingSink {
    fn publish(&self, event: TtsEndpointFailureEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub struct Fixture {
    pub clock: Arc<ManualClock>,
    pub sink: Arc<CollectingSink>,
    pub balancer: Arc<TtsLoadBalancer>,
}

/// Balancer over endpoints `(id, base_url)` with a manual clock.
pub fn balancer(endpoints: &[(&str, &str)], window_secs: u64, interval_secs: u64) -> Fixture {
    let clock = Arc::new(ManualClock::starting_now());
    let sink = Arc::new(CollectingSink::default());
    let endpoints = endpoints
        .iter()
        .map(|(id, url)| TtsEndpoint::new(*id, format!("key-{}", id), *url))
        .collect();
    let balancer = TtsLoadBalancer::new(
        endpoints,
        clock.clone() as Arc<dyn Clock>,
        sink.clone(),
        LoadBalancerConfig {
            recovery_window: Duration::from_secs(window_secs),
            recovery_check_interval: Duration::from_secs(interval_secs),
        },
    )
    .expect("balancer");
    Fixture {
        clock,
        sink,
        balancer: Arc::new(balancer),
    }
}

/// Reads one HTTP request: headers, then `content-length` body bytes.
async fn read_request(socket: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);
        let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
        let length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if buf.len() >= end + 4 + length {
            return;
        }
    }
}

/// Raw HTTP server that answers every request with `response` and then keeps the connection
/// open for `hold` before closing it. Returns the base url.
pub async fn raw_server(response: &'static [u8], hold: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                read_request(&mut socket).await;
                let _ = socket.write_all(response).await;
                let _ = socket.flush().await;
                tokio::time::sleep(hold).await;
            });
        }
    });
    format!("http://{}", addr)
}
