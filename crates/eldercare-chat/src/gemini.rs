//! Gemini `generateContent` backend.

use std::time::Duration;

use async_trait::async_trait;
use eldercare_core::config::ModelConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::ChatError;
use crate::generator::{GenerateRequest, LlmBackend, Segment};

/// Fallback variable consulted when `api_key_env` is unset.
pub const FALLBACK_API_KEY_ENV: &str = "GEMINI_API_KEY";

pub struct GeminiBackend {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

impl GeminiBackend {
    pub fn new(config: &ModelConfig, api_key: String) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Build a backend, reading the credential from the environment.
    pub fn from_env(config: &ModelConfig) -> Result<Self, ChatError> {
        let api_key = resolve_api_key(
            std::env::var(&config.api_key_env).ok(),
            std::env::var(FALLBACK_API_KEY_ENV).ok(),
        )
        .ok_or_else(|| ChatError::MissingCredential(config.api_key_env.clone()))?;
        Ok(Self::new(config, api_key))
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

/// First non-blank key, preferring the configured variable.
fn resolve_api_key(primary: Option<String>, fallback: Option<String>) -> Option<String> {
    primary
        .filter(|k| !k.trim().is_empty())
        .or_else(|| fallback.filter(|k| !k.trim().is_empty()))
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    system_instruction: GeminiSystemInstruction,
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    data: String,
    mime_type: String,
}

#[derive(Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiError>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContentResponse>,
}

#[derive(Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Deserialize)]
struct GeminiPartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct GeminiError {
    message: String,
}

fn to_wire(request: &GenerateRequest) -> GeminiRequest {
    let contents = request
        .turns
        .iter()
        .map(|turn| GeminiContent {
            role: turn.role.clone(),
            parts: turn
                .segments
                .iter()
                .map(|seg| match seg {
                    Segment::Text(text) => GeminiPart::Text { text: text.clone() },
                    Segment::InlineData { data, mime_type } => GeminiPart::Inline {
                        inline_data: GeminiInlineData {
                            data: data.clone(),
                            mime_type: mime_type.clone(),
                        },
                    },
                })
                .collect(),
        })
        .collect();

    GeminiRequest {
        contents,
        system_instruction: GeminiSystemInstruction {
            parts: vec![GeminiPart::Text {
                text: request.system_instruction.clone(),
            }],
        },
        generation_config: GeminiGenerationConfig {
            temperature: request.temperature,
        },
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(response: GeminiResponse) -> Option<String> {
    let parts = response
        .candidates?
        .into_iter()
        .next()?
        .content?
        .parts;
    let text: String = parts.into_iter().filter_map(|p| p.text).collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[async_trait]
impl LlmBackend for GeminiBackend {
    async fn generate(&self, request: &GenerateRequest) -> Result<Option<String>, ChatError> {
        let body = to_wire(request);

        let response = self
            .client
            .post(self.url())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<GeminiResponse>(&text)
                .ok()
                .and_then(|r| r.error)
                .map(|e| e.message)
                .unwrap_or(text);
            return Err(ChatError::Provider(format!("{}: {}", status, message)));
        }

        let parsed: GeminiResponse = serde_json::from_str(&text)
            .map_err(|e| ChatError::Provider(format!("malformed response: {}", e)))?;

        if let Some(err) = parsed.error {
            return Err(ChatError::Provider(err.message));
        }

        let reply = extract_text(parsed);
        tracing::debug!(
            model = %self.model,
            reply_len = reply.as_ref().map_or(0, |r| r.len()),
            "Gemini reply received"
        );
        Ok(reply)
    }
}
