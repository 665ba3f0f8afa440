//! Conversational core for ElderCare.
//!
//! Provides the parent check-in conversation, the child dashboard, the
//! shared activity log between them, and response generation against a
//! pluggable model backend.

pub mod dashboard;
pub mod device;
pub mod error;
pub mod extract;
pub mod gemini;
pub mod generator;
pub mod log_store;
pub mod mock;
pub mod parent;
pub mod shell;

pub use dashboard::{ChildDashboard, DashboardSummary, MedicineCompliance};
pub use device::{Geolocator, Microphone, NoDevices, PickedFile, Recording};
pub use error::ChatError;
pub use extract::CheckInExtractor;
pub use gemini::GeminiBackend;
pub use generator::{
    GenerateRequest, LlmBackend, ResponseGenerator, Segment, Turn, CONNECTION_ERROR_FALLBACK,
    EMPTY_REPLY_FALLBACK,
};
pub use log_store::{log_store, LogReader, LogWriter};
pub use parent::{ConversationState, Outgoing, ParentController, SendOutcome};
pub use shell::Shell;
