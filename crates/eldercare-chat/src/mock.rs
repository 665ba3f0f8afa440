//! Scripted backends and devices for tests and offline runs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use eldercare_core::types::GeoLocation;
use tokio::sync::Notify;

use crate::device::{Geolocator, Microphone, Recording};
use crate::error::ChatError;
use crate::generator::{GenerateRequest, LlmBackend, Segment};

// =============================================================================
// MockBackend
// =============================================================================

/// What a [`MockBackend`] does with each request.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Always answer with this text.
    Reply(String),
    /// Answer with the first text segment of the last turn.
    Echo,
    /// Answer without any text.
    Empty,
    /// Fail as if the network were down.
    Fail,
}

/// In-memory [`LlmBackend`] that records every request it receives.
pub struct MockBackend {
    behavior: MockBehavior,
    calls: AtomicUsize,
    requests: Mutex<Vec<GenerateRequest>>,
    gate: Option<Notify>,
    started: Notify,
}

impl MockBackend {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            gate: None,
            started: Notify::new(),
        }
    }

    pub fn reply(text: &str) -> Self {
        Self::new(MockBehavior::Reply(text.to_string()))
    }

    pub fn echo() -> Self {
        Self::new(MockBehavior::Echo)
    }

    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Fail)
    }

    /// Hold every call until [`MockBackend::release`] is called.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Notify::new());
        self
    }

    /// Let one held call complete.
    pub fn release(&self) {
        if let Some(ref gate) = self.gate {
            gate.notify_one();
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Wait until at least `n` calls have started.
    pub async fn wait_for_calls(&self, n: usize) {
        while self.call_count() < n {
            self.started.notified().await;
        }
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn last_request(&self) -> Option<GenerateRequest> {
        self.requests().pop()
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    async fn generate(&self, request: &GenerateRequest) -> Result<Option<String>, ChatError> {
        if let Ok(mut reqs) = self.requests.lock() {
            reqs.push(request.clone());
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();

        if let Some(ref gate) = self.gate {
            gate.notified().await;
        }

        match &self.behavior {
            MockBehavior::Reply(text) => Ok(Some(text.clone())),
            MockBehavior::Echo => Ok(request.turns.last().and_then(|t| {
                t.segments.iter().find_map(|s| match s {
                    Segment::Text(text) => Some(text.clone()),
                    Segment::InlineData { .. } => None,
                })
            })),
            MockBehavior::Empty => Ok(None),
            MockBehavior::Fail => Err(ChatError::Provider("connection refused".to_string())),
        }
    }
}

// =============================================================================
// Mock devices
// =============================================================================

/// Microphone that yields fixed chunks, or refuses access.
pub struct MockMicrophone {
    chunks: Vec<Vec<u8>>,
    deny: bool,
}

impl MockMicrophone {
    pub fn with_chunks(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            chunks,
            deny: false,
        }
    }

    pub fn denied() -> Self {
        Self {
            chunks: vec![],
            deny: true,
        }
    }
}

struct MockRecording {
    chunks: Vec<Vec<u8>>,
}

#[async_trait]
impl Recording for MockRecording {
    async fn finish(self: Box<Self>) -> Result<Vec<Vec<u8>>, ChatError> {
        Ok(self.chunks)
    }
}

#[async_trait]
impl Microphone for MockMicrophone {
    async fn open(&self) -> Result<Box<dyn Recording>, ChatError> {
        if self.deny {
            return Err(ChatError::PermissionDenied("microphone".to_string()));
        }
        Ok(Box::new(MockRecording {
            chunks: self.chunks.clone(),
        }))
    }
}

/// Geolocator that returns a fixed position, or refuses access.
pub struct MockGeolocator {
    position: Option<GeoLocation>,
}

impl MockGeolocator {
    pub fn at(lat: f64, lng: f64) -> Self {
        Self {
            position: Some(GeoLocation::new(lat, lng)),
        }
    }

    pub fn denied() -> Self {
        Self { position: None }
    }
}

#[async_trait]
impl Geolocator for MockGeolocator {
    async fn current_position(&self) -> Result<GeoLocation, ChatError> {
        self.position
            .ok_or_else(|| ChatError::PermissionDenied("location".to_string()))
    }
}
