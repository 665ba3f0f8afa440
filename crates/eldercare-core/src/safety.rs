//! Deterministic emergency gate for parent messages.
//!
//! The parent persona asks the model to answer emergencies with a fixed
//! instruction, but instruction-following is not a guarantee. This gate scans
//! the parent's text locally so an emergency reply never depends on the model.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::SafetyConfig;

/// Family of emergency detected in a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmergencyKind {
    ChestPain,
    Fall,
    Confusion,
    BreathingDifficulty,
    /// Matched one of the configured extra keywords.
    Custom,
}

/// Decision made by the gate about a piece of parent text.
#[derive(Debug, Clone, PartialEq)]
pub enum SafetyDecision {
    /// Nothing alarming; hand the message to the model.
    Allow,
    /// Emergency detected; answer with the fixed response.
    Emergency { kind: EmergencyKind, matched: String },
}

impl SafetyDecision {
    pub fn is_emergency(&self) -> bool {
        matches!(self, SafetyDecision::Emergency { .. })
    }
}

// =============================================================================
// Built-in patterns (compiled once)
// =============================================================================

static EMERGENCY_PATTERNS: LazyLock<Vec<(EmergencyKind, Regex)>> = LazyLock::new(|| {
    let table: &[(EmergencyKind, &[&str])] = &[
        (
            EmergencyKind::ChestPain,
            &[
                r"(?i)\bchest\s+(?:pain|pains|hurts?|tightness|pressure)\b",
                r"(?i)\bpain\s+in\s+(?:my\s+)?chest\b",
                r"(?i)\bheart\s+attack\b",
            ],
        ),
        (
            EmergencyKind::Fall,
            &[
                r"(?i)\b(?:fell|fallen)\b",
                r"(?i)\bhad\s+a\s+fall\b",
                r"(?i)\bfalling\s+down\b",
                r"(?i)\bslipped\b",
            ],
        ),
        (
            EmergencyKind::Confusion,
            &[
                r"(?i)\bconfused\b",
                r"(?i)\bconfusion\b",
                r"(?i)\bdon'?t\s+know\s+where\s+i\s+am\b",
                r"(?i)\bcan'?t\s+remember\s+where\s+i\b",
            ],
        ),
        (
            EmergencyKind::BreathingDifficulty,
            &[
                r"(?i)\b(?:can'?t|cannot|hard\s+to|difficulty|trouble)\s+breath(?:e|ing)\b",
                r"(?i)\bshort(?:ness)?\s+of\s+breath\b",
                r"(?i)\bbreathless\b",
                r"(?i)\bbreathing\s+(?:problems?|issues?|difficulty|trouble)\b",
            ],
        ),
    ];

    table
        .iter()
        .flat_map(|(kind, pats)| {
            pats.iter()
                .map(move |p| (*kind, Regex::new(p).expect("Invalid emergency regex")))
        })
        .collect()
});

/// Everyday phrases that contain an emergency word. A match inside one of
/// these spans is ignored.
static BENIGN_PATTERNS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:fell|fallen)\s+(?:asleep|in\s+love|apart|behind|short|silent|quiet|ill|sick)\b",
    )
    .expect("Invalid benign regex")
});

/// Build the extra-keyword pattern. Word boundaries are applied only on a
/// side where the keyword starts or ends with a word character.
fn keyword_pattern(keywords: &[String]) -> Option<Regex> {
    let alternatives: Vec<String> = keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .map(|k| {
            let is_word = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric() || c == '_');
            format!(
                "{}{}{}",
                if is_word(k.chars().next()) { r"\b" } else { "" },
                regex::escape(k),
                if is_word(k.chars().last()) { r"\b" } else { "" },
            )
        })
        .collect();
    if alternatives.is_empty() {
        return None;
    }
    Regex::new(&format!("(?i)(?:{})", alternatives.join("|"))).ok()
}

// =============================================================================
// EmergencyGate
// =============================================================================

/// Keyword gate run in front of the parent's model call.
pub struct EmergencyGate {
    config: SafetyConfig,
    extra: Option<Regex>,
}

impl EmergencyGate {
    /// Create a new gate with the given configuration.
    pub fn new(config: SafetyConfig) -> Self {
        let extra = keyword_pattern(&config.extra_keywords);
        Self { config, extra }
    }

    pub fn enabled(&self) -> bool {
        self.config.emergency_gate
    }

    /// Fixed reply used when an emergency is detected.
    pub fn emergency_response(&self) -> &str {
        &self.config.emergency_response
    }

    /// Check text and return a safety decision.
    ///
    /// Always returns `Allow` when the gate is disabled.
    pub fn check(&self, content: &str) -> SafetyDecision {
        if !self.config.emergency_gate {
            return SafetyDecision::Allow;
        }

        let benign: Vec<(usize, usize)> = BENIGN_PATTERNS
            .find_iter(content)
            .map(|m| (m.start(), m.end()))
            .collect();
        let is_benign = |m: &regex::Match<'_>| {
            benign
                .iter()
                .any(|&(start, end)| m.start() >= start && m.end() <= end)
        };

        for (kind, re) in EMERGENCY_PATTERNS.iter() {
            if let Some(m) = re.find_iter(content).find(|m| !is_benign(m)) {
                return SafetyDecision::Emergency {
                    kind: *kind,
                    matched: m.as_str().to_string(),
                };
            }
        }

        if let Some(m) = self.extra.as_ref().and_then(|re| re.find(content)) {
            return SafetyDecision::Emergency {
                kind: EmergencyKind::Custom,
                matched: m.as_str().to_string(),
            };
        }

        SafetyDecision::Allow
    }
}

impl Default for EmergencyGate {
    fn default() -> Self {
        Self::new(SafetyConfig::default())
    }
}
