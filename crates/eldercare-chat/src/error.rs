//! Error types for the conversational engine.

use eldercare_core::error::ElderCareError;

/// Errors from the chat engine.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("recording is already active")]
    RecordingActive,
    #[error("recording is not active")]
    RecordingInactive,
    #[error("provider error: {0}")]
    Provider(String),
    #[error("missing credential: {0}")]
    MissingCredential(String),
    #[error("media error: {0}")]
    Media(String),
}

impl From<ElderCareError> for ChatError {
    fn from(err: ElderCareError) -> Self {
        match err {
            ElderCareError::UnsupportedMedia(_) | ElderCareError::InvalidMedia(_) => {
                ChatError::Media(err.to_string())
            }
            other => ChatError::Provider(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::Provider(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_error_display() {
        assert_eq!(
            ChatError::PermissionDenied("microphone".to_string()).to_string(),
            "permission denied: microphone"
        );
        assert_eq!(
            ChatError::DeviceUnavailable("no gps".to_string()).to_string(),
            "device unavailable: no gps"
        );
        assert_eq!(
            ChatError::RecordingActive.to_string(),
            "recording is already active"
        );
        assert_eq!(
            ChatError::RecordingInactive.to_string(),
            "recording is not active"
        );
        assert_eq!(
            ChatError::Provider("503".to_string()).to_string(),
            "provider error: 503"
        );
        assert_eq!(
            ChatError::MissingCredential("API_KEY".to_string()).to_string(),
            "missing credential: API_KEY"
        );
    }

    #[test]
    fn test_media_errors_map_to_media() {
        let err: ChatError = ElderCareError::UnsupportedMedia("text/plain".to_string()).into();
        assert!(matches!(err, ChatError::Media(_)));
        assert!(err.to_string().contains("text/plain"));
    }

    #[test]
    fn test_other_core_errors_map_to_provider() {
        let err: ChatError = ElderCareError::Config("bad".to_string()).into();
        assert!(matches!(err, ChatError::Provider(_)));
    }
}
