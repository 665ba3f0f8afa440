use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ElderCareError, Result};

/// Top-level configuration for the ElderCare assistant.
///
/// Loaded from `~/.eldercare/config.toml` by default. The model credential is
/// never stored here; `model.api_key_env` names the environment variable
/// holding it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElderCareConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub safety: SafetyConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub parent: ParentConfig,
}

impl ElderCareConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ElderCareConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ElderCareError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub parent_name: String,
    pub child_name: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            parent_name: "Uncle".to_string(),
            child_name: "Beta".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Hosted language-model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// API base URL, without the `/models/...` suffix.
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    /// Environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-3-flash-preview".to_string(),
            temperature: 0.7,
            timeout_secs: 60,
            api_key_env: "API_KEY".to_string(),
        }
    }
}

/// Local emergency keyword gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// Scan parent messages for emergencies before calling the model.
    pub emergency_gate: bool,
    /// Extra phrases treated as emergencies on top of the built-in families.
    pub extra_keywords: Vec<String>,
    /// Fixed reply used when the gate trips.
    pub emergency_response: String,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            emergency_gate: true,
            extra_keywords: vec![],
            emergency_response: "Call doctor immediately! Emergency number: 108. Stay safe."
                .to_string(),
        }
    }
}

/// Child dashboard settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// How many log entries feed the timeline and the update context.
    pub recent_entries: usize,
    /// Question asked when the child leaves the query blank.
    pub default_query: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            recent_entries: 5,
            default_query: "What is today's status?".to_string(),
        }
    }
}

/// Parent conversation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParentConfig {
    /// Assistant message the conversation opens with.
    pub greeting: String,
    /// Message text used when the parent shares a location.
    pub location_announcement: String,
}

impl Default for ParentConfig {
    fn default() -> Self {
        Self {
            greeting:
                "Hello Aunty/Uncle, how are you today? Did you take your medicine this morning?"
                    .to_string(),
            location_announcement: "I am sharing my current location.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ElderCareConfig::default();
        assert_eq!(config.model.temperature, 0.7);
        assert_eq!(config.model.api_key_env, "API_KEY");
        assert!(config.safety.emergency_gate);
        assert_eq!(config.dashboard.recent_entries, 5);
        assert_eq!(config.dashboard.default_query, "What is today's status?");
        assert_eq!(
            config.parent.location_announcement,
            "I am sharing my current location."
        );
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
            [model]
            temperature = 0.2

            [dashboard]
            recent_entries = 3
        "#;
        let config: ElderCareConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.model.temperature, 0.2);
        assert_eq!(config.model.model, "gemini-3-flash-preview");
        assert_eq!(config.dashboard.recent_entries, 3);
        assert_eq!(config.dashboard.default_query, "What is today's status?");
        assert_eq!(config.general.parent_name, "Uncle");
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config: ElderCareConfig = toml::from_str("").unwrap();
        assert_eq!(config.model.timeout_secs, 60);
        assert!(config.safety.extra_keywords.is_empty());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = ElderCareConfig::default();
        config.general.parent_name = "Amma".to_string();
        config.safety.extra_keywords = vec!["dizzy".to_string()];
        config.save(&path).unwrap();

        let loaded = ElderCareConfig::load(&path).unwrap();
        assert_eq!(loaded.general.parent_name, "Amma");
        assert_eq!(loaded.safety.extra_keywords, vec!["dizzy".to_string()]);
    }

    #[test]
    fn test_load_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let result = ElderCareConfig::load(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ElderCareError::Io(_))));
    }

    #[test]
    fn test_load_or_default_on_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "model = [[[").unwrap();
        let config = ElderCareConfig::load_or_default(&path);
        assert_eq!(config.model.temperature, 0.7);
    }
}
