//! CLI argument definitions for the ElderCare terminal client.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use eldercare_core::types::UserRole;

/// ElderCare: a caregiving companion that checks in with a parent and keeps
/// their child informed.
#[derive(Parser, Debug)]
#[command(name = "eldercare", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Role to start in (parent or child).
    #[arg(short = 'r', long = "role", default_value = "parent")]
    pub role: UserRole,

    /// Latitude reported by the location device.
    #[arg(long = "lat", requires = "lng", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude reported by the location device.
    #[arg(long = "lng", requires = "lat", allow_hyphen_values = true)]
    pub lng: Option<f64>,

    /// Audio file played back as the microphone.
    #[arg(long = "recording")]
    pub recording: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Answer locally without contacting the model.
    #[arg(long = "offline")]
    pub offline: bool,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > ELDERCARE_CONFIG env var > ~/.eldercare/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("ELDERCARE_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the log level against the config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".eldercare").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".eldercare").join("config.toml");
    }
    PathBuf::from("config.toml")
}
