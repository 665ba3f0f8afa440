//! Device capability boundary: microphone, geolocation and picked files.
//!
//! The controllers only see these traits. Platform code (a browser shell,
//! a terminal, a phone) supplies the implementations.

use async_trait::async_trait;
use eldercare_core::types::GeoLocation;

use crate::error::ChatError;

/// MIME type of packaged microphone recordings.
pub const RECORDING_MIME_TYPE: &str = "audio/webm";

/// Source of microphone capture sessions.
#[async_trait]
pub trait Microphone: Send + Sync {
    /// Acquire the microphone and start capturing.
    ///
    /// Fails with [`ChatError::PermissionDenied`] when access is refused.
    async fn open(&self) -> Result<Box<dyn Recording>, ChatError>;
}

/// A live capture session.
#[async_trait]
pub trait Recording: Send {
    /// Stop capturing, release the device and hand back the recorded chunks.
    async fn finish(self: Box<Self>) -> Result<Vec<Vec<u8>>, ChatError>;
}

/// One-shot position lookup.
#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn current_position(&self) -> Result<GeoLocation, ChatError>;
}

/// A file chosen by the user, as delivered by the platform's picker.
#[derive(Debug, Clone)]
pub struct PickedFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Devices that are never available. Used where a surface has no hardware.
pub struct NoDevices;

#[async_trait]
impl Microphone for NoDevices {
    async fn open(&self) -> Result<Box<dyn Recording>, ChatError> {
        Err(ChatError::DeviceUnavailable("no microphone".to_string()))
    }
}

#[async_trait]
impl Geolocator for NoDevices {
    async fn current_position(&self) -> Result<GeoLocation, ChatError> {
        Err(ChatError::DeviceUnavailable("no location service".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_devices_are_unavailable() {
        assert!(matches!(
            NoDevices.open().await,
            Err(ChatError::DeviceUnavailable(_))
        ));
        assert!(matches!(
            NoDevices.current_position().await,
            Err(ChatError::DeviceUnavailable(_))
        ));
    }
}
