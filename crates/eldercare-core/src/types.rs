use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ElderCareError, Result};

// =============================================================================
// Enums
// =============================================================================

/// Which persona is active in the shell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    /// The elderly parent doing daily check-ins.
    #[default]
    Parent,
    /// The adult child reading the dashboard.
    Child,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Parent => write!(f, "parent"),
            UserRole::Child => write!(f, "child"),
        }
    }
}

impl FromStr for UserRole {
    type Err = ElderCareError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "parent" => Ok(UserRole::Parent),
            "child" => Ok(UserRole::Child),
            other => Err(ElderCareError::Config(format!("unknown role: {}", other))),
        }
    }
}

/// Who authored a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    /// Role label understood by the hosted model.
    pub fn provider_role(&self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::Assistant => "model",
        }
    }

    /// Label used in the dashboard's activity log.
    pub fn label(&self) -> &'static str {
        match self {
            Speaker::User => "Parent",
            Speaker::Assistant => "ElderCare",
        }
    }
}

/// Top-level kind of an attachment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }
}

impl FromStr for MediaKind {
    type Err = ElderCareError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "image" => Ok(MediaKind::Image),
            "video" => Ok(MediaKind::Video),
            "audio" => Ok(MediaKind::Audio),
            other => Err(ElderCareError::UnsupportedMedia(other.to_string())),
        }
    }
}

// =============================================================================
// Media
// =============================================================================

/// An attachment carried by a message.
///
/// `data` is standard base64 without a data-URL prefix. The display handle is
/// a local-only reference for rendering and is never serialized or sent to
/// the model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub kind: MediaKind,
    /// MIME subtype as reported by the source, e.g. `png` or `webm`.
    pub subtype: String,
    pub data: String,
    #[serde(skip)]
    pub display_handle: Option<String>,
}

impl Media {
    /// Encode raw bytes under the given MIME type.
    pub fn encode(bytes: &[u8], mime_type: &str) -> Result<Self> {
        let (kind, subtype) = parse_mime(mime_type)?;
        Ok(Self {
            kind,
            subtype,
            data: STANDARD.encode(bytes),
            display_handle: None,
        })
    }

    /// Wrap an already base64-encoded payload, validating both halves.
    pub fn from_base64(data: String, mime_type: &str) -> Result<Self> {
        let (kind, subtype) = parse_mime(mime_type)?;
        STANDARD
            .decode(data.as_bytes())
            .map_err(|e| ElderCareError::InvalidMedia(e.to_string()))?;
        Ok(Self {
            kind,
            subtype,
            data,
            display_handle: None,
        })
    }

    pub fn with_display_handle(mut self, handle: impl Into<String>) -> Self {
        self.display_handle = Some(handle.into());
        self
    }

    /// Full MIME type, e.g. `audio/webm`.
    pub fn mime_type(&self) -> String {
        format!("{}/{}", self.kind.as_str(), self.subtype)
    }

    /// Decode the payload back to raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(self.data.as_bytes())
            .map_err(|e| ElderCareError::InvalidMedia(e.to_string()))
    }

    /// Length of the encoded payload in bytes.
    pub fn encoded_len(&self) -> usize {
        self.data.len()
    }
}

fn parse_mime(mime_type: &str) -> Result<(MediaKind, String)> {
    let (top, sub) = mime_type
        .trim()
        .split_once('/')
        .ok_or_else(|| ElderCareError::UnsupportedMedia(mime_type.to_string()))?;
    let kind: MediaKind = top.parse()?;
    let sub = sub.trim();
    if sub.is_empty() {
        return Err(ElderCareError::UnsupportedMedia(mime_type.to_string()));
    }
    Ok((kind, sub.to_ascii_lowercase()))
}

// =============================================================================
// Location
// =============================================================================

/// A device position in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub lat: f64,
    pub lng: f64,
}

impl GeoLocation {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl fmt::Display for GeoLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.lat, self.lng)
    }
}

// =============================================================================
// Messages
// =============================================================================

/// One chat message. Immutable once created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub speaker: Speaker,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<Media>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoLocation>,
}

impl Message {
    pub fn user(
        content: impl Into<String>,
        media: Option<Media>,
        location: Option<GeoLocation>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            speaker: Speaker::User,
            content: content.into(),
            timestamp: Utc::now(),
            media,
            location,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            speaker: Speaker::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            media: None,
            location: None,
        }
    }
}

/// A prior turn handed to the response generator.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    pub speaker: Speaker,
    pub content: String,
    pub media: Option<Media>,
    pub location: Option<GeoLocation>,
}

impl From<&Message> for HistoryEntry {
    fn from(msg: &Message) -> Self {
        Self {
            speaker: msg.speaker,
            content: msg.content.clone(),
            media: msg.media.clone(),
            location: msg.location,
        }
    }
}

// =============================================================================
// Structured check-ins
// =============================================================================

/// Structured fields pulled out of a parent's check-in message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CheckInLog {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub mood: Option<String>,
    /// `Some(true)` taken, `Some(false)` explicitly missed, `None` not mentioned.
    pub medicine: Option<bool>,
    pub activity: Option<String>,
    pub meal: Option<String>,
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoLocation>,
}

/// Snapshot of a whole session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    pub current_role: UserRole,
    pub parent_name: String,
    pub child_name: String,
    pub messages: Vec<Message>,
    pub logs: Vec<CheckInLog>,
}
