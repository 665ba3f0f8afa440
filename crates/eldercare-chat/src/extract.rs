//! Structured check-in extraction.
//!
//! Pulls medicine, meal, activity and mood signals out of a parent's free
//! text with fixed regex families, producing a [`CheckInLog`].

use std::sync::LazyLock;

use eldercare_core::types::{CheckInLog, Message, Speaker};
use regex::Regex;
use uuid::Uuid;

// =============================================================================
// Compiled regex sets (compiled once, reused across calls)
// =============================================================================

struct CheckInPatterns {
    medicine_missed: Vec<Regex>,
    medicine_taken: Vec<Regex>,
    meal: Regex,
    activity: Regex,
    mood_negative: Regex,
    mood_positive: Regex,
}

static PATTERNS: LazyLock<CheckInPatterns> = LazyLock::new(|| {
    let mk = |pats: &[String]| -> Vec<Regex> {
        pats.iter()
            .map(|p| Regex::new(p).expect("Invalid check-in regex"))
            .collect()
    };
    let meds = r"(?:medicines?|medications?|tablets?|pills?|meds|dose|insulin)";

    CheckInPatterns {
        // Missed patterns are checked first so "didn't take my tablets" is not read as taken.
        medicine_missed: mk(&[
            format!(r"(?i)\b(?:didn'?t|did\s+not|haven'?t|have\s+not|not\s+yet|forgot\s+to)\s+(?:take|taken|had)?\s*(?:my\s+|the\s+)?{}", meds),
            format!(r"(?i)\b(?:forgot|missed|skipped)\s+(?:my\s+|the\s+)?{}", meds),
            format!(r"(?i)\bno\s+{}\b", meds),
        ]),
        medicine_taken: mk(&[
            format!(r"(?i)\b(?:took|taken|had|take)\s+(?:all\s+)?(?:my\s+|the\s+)?(?:morning\s+|evening\s+|night\s+)?{}", meds),
            format!(r"(?i)\b{}\s+(?:done|taken|finished)\b", meds),
        ]),
        meal: Regex::new(
            r"(?i)\b(?:breakfast|lunch|dinner|supper|snack|ate|eaten|had\s+(?:some\s+)?(?:idli|dosa|poha|roti|chapati|rice|dal|khichdi|upma|paratha|fruit|tea|chai|soup))\b",
        )
        .expect("Invalid meal regex"),
        activity: Regex::new(
            r"(?i)\b(?:walk(?:ed|ing)?|yoga|exercise[ds]?|stretch(?:ed|ing)?|garden(?:ing)?|temple|market|park|stepped\s+out|went\s+out)\b",
        )
        .expect("Invalid activity regex"),
        mood_negative: Regex::new(
            r"(?i)\b(?:sad|lonely|tired|upset|worried|anxious|low|bored|not\s+(?:good|well|great)|unwell)\b",
        )
        .expect("Invalid mood regex"),
        mood_positive: Regex::new(
            r"(?i)\b(?:happy|good|great|fine|well|cheerful|okay|ok|relaxed|wonderful)\b",
        )
        .expect("Invalid mood regex"),
    }
});

/// Derives [`CheckInLog`] records from parent messages.
#[derive(Debug, Default, Clone, Copy)]
pub struct CheckInExtractor;

impl CheckInExtractor {
    /// Extract a check-in from one message.
    ///
    /// Returns `None` for assistant messages and for user messages that carry
    /// no check-in signal and no location.
    pub fn extract(&self, message: &Message) -> Option<CheckInLog> {
        if message.speaker != Speaker::User {
            return None;
        }
        let text = message.content.as_str();

        let medicine = detect_medicine(text);
        let meal = first_match(&PATTERNS.meal, text);
        let activity = first_match(&PATTERNS.activity, text);
        let mood = detect_mood(text);

        if medicine.is_none()
            && meal.is_none()
            && activity.is_none()
            && mood.is_none()
            && message.location.is_none()
        {
            return None;
        }

        Some(CheckInLog {
            id: Uuid::new_v4(),
            timestamp: message.timestamp,
            mood,
            medicine,
            activity,
            meal,
            notes: message.content.clone(),
            location: message.location,
        })
    }

    /// Extract check-ins from a whole log, keeping log order.
    pub fn extract_all(&self, messages: &[Message]) -> Vec<CheckInLog> {
        messages.iter().filter_map(|m| self.extract(m)).collect()
    }
}

fn detect_medicine(text: &str) -> Option<bool> {
    if PATTERNS.medicine_missed.iter().any(|re| re.is_match(text)) {
        Some(false)
    } else if PATTERNS.medicine_taken.iter().any(|re| re.is_match(text)) {
        Some(true)
    } else {
        None
    }
}

fn detect_mood(text: &str) -> Option<String> {
    if let Some(m) = PATTERNS.mood_negative.find(text) {
        return Some(m.as_str().to_lowercase());
    }
    first_match(&PATTERNS.mood_positive, text)
}

fn first_match(re: &Regex, text: &str) -> Option<String> {
    re.find(text).map(|m| m.as_str().to_lowercase())
}
