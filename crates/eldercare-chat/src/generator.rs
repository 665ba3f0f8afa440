//! Response generation against the hosted language model.
//!
//! Turns a role, the newest utterance and the prior conversation into one
//! provider request, and reduces whatever comes back to plain text. Failures
//! never reach the caller: they become one of two fixed apology strings.

use std::sync::Arc;

use async_trait::async_trait;
use eldercare_core::prompts;
use eldercare_core::types::{HistoryEntry, Speaker, UserRole};

use crate::error::ChatError;

/// Reply used when the model answers without any text.
pub const EMPTY_REPLY_FALLBACK: &str =
    "I'm sorry, I'm having trouble connecting right now. Please try again.";

/// Reply used when the call itself fails.
pub const CONNECTION_ERROR_FALLBACK: &str =
    "Error: Could not reach ElderCare. Please check your internet connection.";

/// Sampling temperature used when none is configured.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

// =============================================================================
// Request model
// =============================================================================

/// One piece of a turn's payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    InlineData { data: String, mime_type: String },
}

/// One role-tagged unit of conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    /// Provider role label: `user` or `model`.
    pub role: String,
    pub segments: Vec<Segment>,
}

impl Turn {
    pub fn is_user(&self) -> bool {
        self.role == Speaker::User.provider_role()
    }
}

/// Everything the provider needs for a single generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub system_instruction: String,
    pub temperature: f32,
    pub turns: Vec<Turn>,
}

/// Opaque request/response boundary to the hosted model.
///
/// `Ok(None)` means the provider answered but carried no text.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<Option<String>, ChatError>;
}

/// Convert history into provider turns, closing with `prompt` when needed.
///
/// The prompt is appended as a final user turn only if there are no turns or
/// the last one is not from the user.
pub fn build_turns(prompt: &str, history: &[HistoryEntry]) -> Vec<Turn> {
    let mut turns: Vec<Turn> = history.iter().map(history_turn).collect();

    if turns.last().map_or(true, |t| !t.is_user()) {
        turns.push(Turn {
            role: Speaker::User.provider_role().to_string(),
            segments: vec![Segment::Text(prompt.to_string())],
        });
    }

    turns
}

fn history_turn(entry: &HistoryEntry) -> Turn {
    let mut segments = vec![Segment::Text(entry.content.clone())];
    if let Some(loc) = entry.location {
        segments.push(Segment::Text(location_prompt(&loc)));
    }
    if let Some(ref media) = entry.media {
        segments.push(Segment::InlineData {
            data: media.data.clone(),
            mime_type: media.mime_type(),
        });
    }
    Turn {
        role: entry.speaker.provider_role().to_string(),
        segments,
    }
}

/// Text announcing a shared position to the model.
pub fn location_prompt(loc: &eldercare_core::types::GeoLocation) -> String {
    format!("I'm at these coordinates: {}", loc)
}

// =============================================================================
// ResponseGenerator
// =============================================================================

/// Builds requests for a role and calls the backend.
#[derive(Clone)]
pub struct ResponseGenerator {
    backend: Arc<dyn LlmBackend>,
    temperature: f32,
}

impl ResponseGenerator {
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self {
            backend,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Assemble the provider request without sending it.
    pub fn build_request(
        &self,
        prompt: &str,
        role: UserRole,
        history: &[HistoryEntry],
    ) -> GenerateRequest {
        GenerateRequest {
            system_instruction: prompts::system_instruction(role).to_string(),
            temperature: self.temperature,
            turns: build_turns(prompt, history),
        }
    }

    /// Generate a reply. Never fails; errors become fixed apology strings.
    pub async fn generate_response(
        &self,
        prompt: &str,
        role: UserRole,
        history: &[HistoryEntry],
    ) -> String {
        let request = self.build_request(prompt, role, history);
        tracing::debug!(role = ?role, turns = request.turns.len(), "Sending generation request");

        match self.backend.generate(&request).await {
            Ok(Some(text)) if !text.is_empty() => text,
            Ok(_) => {
                tracing::warn!(role = ?role, "Model returned an empty reply");
                EMPTY_REPLY_FALLBACK.to_string()
            }
            Err(e) => {
                tracing::error!(role = ?role, error = %e, "Generation failed");
                CONNECTION_ERROR_FALLBACK.to_string()
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
