//! Terminal stand-ins for the device capabilities.
//!
//! A terminal has no microphone permission prompt or GPS, so recordings are
//! played back from a file and the position comes from the command line.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use eldercare_chat::device::{Geolocator, Microphone, PickedFile, Recording};
use eldercare_chat::ChatError;
use eldercare_core::types::GeoLocation;

/// Size of the chunks a file-backed recording is delivered in.
const CHUNK_SIZE: usize = 16 * 1024;

/// Microphone that "records" the contents of an audio file.
pub struct FileMicrophone {
    path: PathBuf,
}

impl FileMicrophone {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

struct FileRecording {
    bytes: Vec<u8>,
}

#[async_trait]
impl Recording for FileRecording {
    async fn finish(self: Box<Self>) -> Result<Vec<Vec<u8>>, ChatError> {
        Ok(self.bytes.chunks(CHUNK_SIZE).map(<[u8]>::to_vec).collect())
    }
}

#[async_trait]
impl Microphone for FileMicrophone {
    async fn open(&self) -> Result<Box<dyn Recording>, ChatError> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            ChatError::DeviceUnavailable(format!("{}: {}", self.path.display(), e))
        })?;
        tracing::debug!(path = %self.path.display(), bytes = bytes.len(), "Recording source opened");
        Ok(Box::new(FileRecording { bytes }))
    }
}

/// Geolocator pinned to one position.
pub struct FixedGeolocator {
    position: GeoLocation,
}

impl FixedGeolocator {
    pub fn new(position: GeoLocation) -> Self {
        Self { position }
    }
}

#[async_trait]
impl Geolocator for FixedGeolocator {
    async fn current_position(&self) -> Result<GeoLocation, ChatError> {
        Ok(self.position)
    }
}

/// Read a file from disk the way a file picker would hand it over.
pub async fn read_picked_file(path: &Path) -> Result<PickedFile, ChatError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ChatError::Media(format!("{}: {}", path.display(), e)))?;
    let mime_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    Ok(PickedFile {
        name,
        mime_type,
        bytes,
    })
}
