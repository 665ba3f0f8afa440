//! Parent-facing conversation controller.
//!
//! Owns the live message list for the check-in chat, the draft input and the
//! single pending-media slot. Requests are serialized: while one reply is in
//! flight further sends are rejected as [`SendOutcome::Busy`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use eldercare_core::config::ParentConfig;
use eldercare_core::safety::{EmergencyGate, SafetyDecision};
use eldercare_core::types::{GeoLocation, HistoryEntry, Media, Message, UserRole};

use crate::device::{
    Geolocator, Microphone, NoDevices, PickedFile, Recording, RECORDING_MIME_TYPE,
};
use crate::error::ChatError;
use crate::generator::{location_prompt, ResponseGenerator};
use crate::log_store::LogWriter;

/// Where the conversation is in its send cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    Idle,
    /// The parent has typed something that is not sent yet.
    Composing,
    /// A reply is being generated.
    Sending,
}

/// What the parent wants to send. Missing fields fall back to the current
/// draft and the pending media slot.
#[derive(Debug, Clone, Default)]
pub struct Outgoing {
    pub text: Option<String>,
    pub media: Option<Media>,
    pub location: Option<GeoLocation>,
}

impl Outgoing {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }
}

/// Result of a send attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// Nothing to send: no text, media or location.
    Skipped,
    /// Another request is still in flight.
    Busy,
    /// Both turns were appended.
    Completed { user: Message, reply: Message },
    /// The conversation was reset while the reply was pending; the reply was
    /// dropped but the user turn still reached the log.
    Discarded { user: Message },
}

struct ParentState {
    messages: Vec<Message>,
    draft: String,
    pending_media: Option<Media>,
    state: ConversationState,
    /// Bumped for every request and on reset; completions carry the value they started with.
    seq: u64,
    recording: Option<Box<dyn Recording>>,
}

impl ParentState {
    /// Leave `Sending`, landing on `Composing` if a draft was typed meanwhile.
    fn settle(&mut self) {
        self.state = if self.draft.trim().is_empty() {
            ConversationState::Idle
        } else {
            ConversationState::Composing
        };
    }
}

/// Held across the model call. If the send future is dropped first, the
/// controller leaves `Sending` and the user turn still reaches the log.
struct InFlight<'a> {
    ctrl: &'a ParentController,
    seq: u64,
    user: Option<Message>,
}

impl InFlight<'_> {
    fn disarm(&mut self) {
        self.user = None;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let Some(user) = self.user.take() else {
            return;
        };
        {
            let mut st = self.ctrl.lock();
            if st.seq == self.seq {
                st.settle();
            }
        }
        tracing::debug!(message_id = %user.id, "Send cancelled before the reply arrived");
        self.ctrl.log.append(user);
    }
}

/// Controller behind the parent chat surface.
pub struct ParentController {
    generator: ResponseGenerator,
    gate: EmergencyGate,
    log: LogWriter,
    microphone: Arc<dyn Microphone>,
    geolocator: Arc<dyn Geolocator>,
    config: ParentConfig,
    inner: Mutex<ParentState>,
}

impl ParentController {
    /// Create a controller that writes user turns to `log`.
    pub fn new(generator: ResponseGenerator, log: LogWriter) -> Self {
        let config = ParentConfig::default();
        Self {
            generator,
            gate: EmergencyGate::default(),
            log,
            microphone: Arc::new(NoDevices),
            geolocator: Arc::new(NoDevices),
            inner: Mutex::new(ParentState {
                messages: vec![Message::assistant(config.greeting.clone())],
                draft: String::new(),
                pending_media: None,
                state: ConversationState::Idle,
                seq: 0,
                recording: None,
            }),
            config,
        }
    }

    pub fn with_config(mut self, config: ParentConfig) -> Self {
        {
            let state = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
            if state.messages.len() == 1 {
                state.messages = vec![Message::assistant(config.greeting.clone())];
            }
        }
        self.config = config;
        self
    }

    pub fn with_gate(mut self, gate: EmergencyGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_microphone(mut self, microphone: Arc<dyn Microphone>) -> Self {
        self.microphone = microphone;
        self
    }

    pub fn with_geolocator(mut self, geolocator: Arc<dyn Geolocator>) -> Self {
        self.geolocator = geolocator;
        self
    }

    fn lock(&self) -> MutexGuard<'_, ParentState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -- Observers --

    pub fn messages(&self) -> Vec<Message> {
        self.lock().messages.clone()
    }

    pub fn state(&self) -> ConversationState {
        self.lock().state
    }

    pub fn draft(&self) -> String {
        self.lock().draft.clone()
    }

    pub fn pending_media(&self) -> Option<Media> {
        self.lock().pending_media.clone()
    }

    pub fn is_recording(&self) -> bool {
        self.lock().recording.is_some()
    }

    // -- Commands --

    /// Replace the draft input.
    pub fn set_draft(&self, text: &str) {
        let mut st = self.lock();
        st.draft = text.to_string();
        if st.state != ConversationState::Sending {
            st.settle();
        }
    }

    /// Send whatever is in the draft and the pending-media slot.
    pub async fn send_draft(&self) -> SendOutcome {
        self.send(Outgoing::default()).await
    }

    /// Send a user turn and wait for the assistant's reply.
    pub async fn send(&self, outgoing: Outgoing) -> SendOutcome {
        let (user, history, seq) = {
            let mut st = self.lock();

            let text = outgoing.text.unwrap_or_else(|| st.draft.clone());
            let has_media = outgoing.media.is_some() || st.pending_media.is_some();
            if text.trim().is_empty() && !has_media && outgoing.location.is_none() {
                return SendOutcome::Skipped;
            }
            if st.state == ConversationState::Sending {
                tracing::debug!("Send rejected, reply still pending");
                return SendOutcome::Busy;
            }

            let staged = st.pending_media.take();
            let media = outgoing.media.or(staged);
            let user = Message::user(text, media, outgoing.location);

            st.messages.push(user.clone());
            st.draft.clear();
            st.state = ConversationState::Sending;
            st.seq += 1;

            let history: Vec<HistoryEntry> = st.messages.iter().map(HistoryEntry::from).collect();
            (user, history, st.seq)
        };

        tracing::info!(
            message_id = %user.id,
            has_media = user.media.is_some(),
            has_location = user.location.is_some(),
            turns = history.len(),
            "Parent message sent"
        );

        let mut in_flight = InFlight {
            ctrl: self,
            seq,
            user: Some(user.clone()),
        };

        let reply_text = match self.gate.check(&user.content) {
            SafetyDecision::Emergency { kind, matched } => {
                tracing::warn!(message_id = %user.id, kind = ?kind, matched = %matched, "Emergency detected, skipping model");
                self.gate.emergency_response().to_string()
            }
            SafetyDecision::Allow => {
                let prompt = match user.location {
                    Some(ref loc) => location_prompt(loc),
                    None => user.content.clone(),
                };
                self.generator
                    .generate_response(&prompt, UserRole::Parent, &history)
                    .await
            }
        };

        in_flight.disarm();

        let reply = Message::assistant(reply_text);
        let current = {
            let mut st = self.lock();
            let current = st.seq == seq;
            if current {
                st.messages.push(reply.clone());
                st.settle();
            }
            current
        };

        // User turns reach the log even when the reply is dropped.
        self.log.append(user.clone());
        if !current {
            tracing::debug!(message_id = %user.id, "Dropping stale reply");
            return SendOutcome::Discarded { user };
        }
        SendOutcome::Completed { user, reply }
    }

    /// Acquire the microphone and start capturing audio.
    pub async fn start_recording(&self) -> Result<(), ChatError> {
        if self.is_recording() {
            return Err(ChatError::RecordingActive);
        }

        let recording = self.microphone.open().await.map_err(|e| {
            tracing::warn!(error = %e, "Microphone unavailable");
            e
        })?;

        let mut st = self.lock();
        if st.recording.is_some() {
            return Err(ChatError::RecordingActive);
        }
        st.recording = Some(recording);
        tracing::info!("Recording started");
        Ok(())
    }

    /// Stop capturing and stage the audio as pending media.
    pub async fn stop_recording(&self) -> Result<Media, ChatError> {
        let recording = self
            .lock()
            .recording
            .take()
            .ok_or(ChatError::RecordingInactive)?;

        let chunks = recording.finish().await?;
        let bytes = chunks.concat();
        let media = encode_media(bytes, RECORDING_MIME_TYPE.to_string()).await?;

        tracing::info!(encoded_len = media.encoded_len(), "Recording staged");
        self.lock().pending_media = Some(media.clone());
        Ok(media)
    }

    /// Stage a picked file as pending media, replacing anything staged before.
    pub async fn attach_file(&self, file: PickedFile) -> Result<Media, ChatError> {
        let PickedFile {
            name,
            mime_type,
            bytes,
        } = file;
        let media = encode_media(bytes, mime_type)
            .await
            .map_err(|e| {
                tracing::warn!(file = %name, error = %e, "Attachment rejected");
                e
            })?
            .with_display_handle(name);

        tracing::info!(mime_type = %media.mime_type(), encoded_len = media.encoded_len(), "File staged");
        self.lock().pending_media = Some(media.clone());
        Ok(media)
    }

    /// Drop whatever is staged without sending it.
    pub fn clear_pending_media(&self) {
        self.lock().pending_media = None;
    }

    /// Look up the device position and send it with the fixed announcement.
    pub async fn share_location(&self) -> Result<SendOutcome, ChatError> {
        if self.state() == ConversationState::Sending {
            return Ok(SendOutcome::Busy);
        }

        let location = self.geolocator.current_position().await.map_err(|e| {
            tracing::warn!(error = %e, "Could not get location");
            e
        })?;

        Ok(self
            .send(Outgoing {
                text: Some(self.config.location_announcement.clone()),
                media: None,
                location: Some(location),
            })
            .await)
    }

    /// Start a fresh conversation. A reply still in flight is dropped on arrival.
    pub fn reset(&self) {
        let mut st = self.lock();
        st.messages = vec![Message::assistant(self.config.greeting.clone())];
        st.draft.clear();
        st.pending_media = None;
        st.state = ConversationState::Idle;
        st.seq += 1;
    }
}

async fn encode_media(bytes: Vec<u8>, mime_type: String) -> Result<Media, ChatError> {
    tokio::task::spawn_blocking(move || Media::encode(&bytes, &mime_type))
        .await
        .map_err(|e| ChatError::Media(e.to_string()))?
        .map_err(ChatError::from)
}

// =============================================================================
// Tests
// =============================================================================
