//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};
use tracing_log_shipper::{HttpRequest, HttpResponse, HttpTransport, TransportError};

/// Transport that records every request and answers with a fixed status.
///
/// When built with [`RecordingTransport::stalled`], each send waits for a
/// permit handed out by [`RecordingTransport::release`].
pub struct RecordingTransport {
    requests: Mutex<Vec<HttpRequest>>,
    status: AtomicU16,
    gate: Option<Semaphore>,
    started: Notify,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(RecordingTransport {
            requests: Mutex::new(Vec::new()),
            status: AtomicU16::new(200),
            gate: None,
            started: Notify::new(),
        })
    }

    pub fn stalled() -> Arc<Self> {
        Arc::new(RecordingTransport {
            requests: Mutex::new(Vec::new()),
            status: AtomicU16::new(200),
            gate: Some(Semaphore::new(0)),
            started: Notify::new(),
        })
    }

    pub fn set_status(&self, status: u16) {
        self.status.store(status, Ordering::SeqCst);
    }

    /// Let `n` stalled sends complete.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Resolves once a send has been entered.
    pub async fn send_started(&self) {
        self.started.notified().await;
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Poll until at least `n` requests were recorded, or panic after a few
    /// seconds.
    pub async fn wait_for(&self, n: usize) -> Vec<HttpRequest> {
        let polled = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if self.request_count() >= n {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(polled.is_ok(), "expected {} request(s), saw {}", n, self.request_count());
        self.requests()
    }
}

#[async_trait]
impl HttpTransport for RecordingTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.started.notify_one();
        if let Some(gate) = &self.gate {
            let permit = gate.acquire().await.expect("gate closed");
            permit.forget();
        }
        Ok(HttpResponse {
            status: self.status.load(Ordering::SeqCst),
            body: Vec::new(),
        })
    }
}

/// Transport that never answers.
pub struct HangingTransport;

#[async_trait]
impl HttpTransport for HangingTransport {
    async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
        std::future::pending().await
    }
}

pub fn body_json(request: &HttpRequest) -> Value {
    serde_json::from_slice(&request.body).expect("request body is not JSON")
}

/// Messages of a batch request body, in order.
pub fn batch_messages(request: &HttpRequest) -> Vec<String> {
    body_json(request)
        .as_array()
        .expect("batch body is not an array")
        .iter()
        .map(|r| r["message"].as_str().unwrap_or_default().to_string())
        .collect()
}
