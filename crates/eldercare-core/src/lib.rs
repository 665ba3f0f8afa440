pub mod config;
pub mod error;
pub mod prompts;
pub mod safety;
pub mod types;

pub use config::ElderCareConfig;
pub use error::{ElderCareError, Result};
pub use safety::{EmergencyGate, EmergencyKind, SafetyDecision};
pub use types::*;
