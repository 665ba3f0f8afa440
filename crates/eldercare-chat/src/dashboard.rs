//! Child-facing dashboard controller.
//!
//! Reads the shared log, derives the "last seen" location, media badge count
//! and recent timeline, and answers status questions through the child
//! persona. Dashboard queries are single-turn: each one sees only the recent
//! log, never earlier dashboard answers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use eldercare_core::config::DashboardConfig;
use eldercare_core::types::{CheckInLog, GeoLocation, Message, UserRole};

use crate::extract::CheckInExtractor;
use crate::generator::ResponseGenerator;
use crate::log_store::LogReader;

// =============================================================================
// Derivations
// =============================================================================

/// Most recent location in the log.
pub fn last_location(logs: &[Message]) -> Option<GeoLocation> {
    logs.iter().rev().find_map(|m| m.location)
}

/// Number of entries carrying an attachment.
pub fn media_count(logs: &[Message]) -> usize {
    logs.iter().filter(|m| m.media.is_some()).count()
}

/// The newest `n` entries, newest first.
pub fn recent_entries(logs: &[Message], n: usize) -> Vec<Message> {
    logs.iter().rev().take(n).cloned().collect()
}

/// Prompt text for a status question over the last `n` entries.
pub fn build_update_context(logs: &[Message], n: usize, question: &str) -> String {
    let start = logs.len().saturating_sub(n);
    let activity = logs[start..]
        .iter()
        .map(|m| format!("{}: {}", m.speaker.label(), m.content))
        .collect::<Vec<_>>()
        .join("\n");
    format!("Activity Log:\n{}\n\nQuestion: {}", activity, question)
}

/// Aggregates shown on the dashboard cards.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSummary {
    pub entries: usize,
    pub last_location: Option<GeoLocation>,
    pub media_count: usize,
    /// Newest first.
    pub timeline: Vec<Message>,
}

/// Medicine reports across extracted check-ins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MedicineCompliance {
    pub taken: usize,
    pub missed: usize,
}

impl MedicineCompliance {
    pub fn reported(&self) -> usize {
        self.taken + self.missed
    }
}

// =============================================================================
// ChildDashboard
// =============================================================================

/// Clears the busy flag when the update finishes or is dropped.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct ChildDashboard {
    generator: ResponseGenerator,
    log: LogReader,
    config: DashboardConfig,
    extractor: CheckInExtractor,
    busy: AtomicBool,
    /// Summary cached against the log revision it was computed from.
    cache: Mutex<Option<(u64, DashboardSummary)>>,
    last_update: Mutex<Option<String>>,
}

impl ChildDashboard {
    pub fn new(generator: ResponseGenerator, log: LogReader) -> Self {
        Self {
            generator,
            log,
            config: DashboardConfig::default(),
            extractor: CheckInExtractor,
            busy: AtomicBool::new(false),
            cache: Mutex::new(None),
            last_update: Mutex::new(None),
        }
    }

    pub fn with_config(mut self, config: DashboardConfig) -> Self {
        self.config = config;
        self
    }

    /// Current aggregates, recomputed only when the log has changed.
    pub fn summary(&self) -> DashboardSummary {
        let revision = self.log.revision();
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((rev, ref summary)) = *cache {
            if rev == revision {
                return summary.clone();
            }
        }

        let logs = self.log.snapshot();
        let summary = DashboardSummary {
            entries: logs.len(),
            last_location: last_location(&logs),
            media_count: media_count(&logs),
            timeline: recent_entries(&logs, self.config.recent_entries),
        };
        *cache = Some((revision, summary.clone()));
        summary
    }

    /// Structured check-ins over the whole log, in log order.
    pub fn check_ins(&self) -> Vec<CheckInLog> {
        self.extractor.extract_all(&self.log.snapshot())
    }

    pub fn medicine_compliance(&self) -> MedicineCompliance {
        self.check_ins()
            .iter()
            .fold(MedicineCompliance::default(), |mut acc, c| {
                match c.medicine {
                    Some(true) => acc.taken += 1,
                    Some(false) => acc.missed += 1,
                    None => {}
                }
                acc
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    fn last_update_slot(&self) -> MutexGuard<'_, Option<String>> {
        self.last_update
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Most recent answer shown to the child.
    pub fn last_update(&self) -> Option<String> {
        self.last_update_slot().clone()
    }

    /// Ask the child persona about the recent log.
    ///
    /// Returns `None` without calling the model when an update is already in
    /// flight.
    pub async fn request_update(&self, query: Option<&str>) -> Option<String> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Dashboard update already in flight");
            return None;
        }
        let _guard = BusyGuard(&self.busy);

        let question = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .unwrap_or(&self.config.default_query);
        let logs = self.log.snapshot();
        let context = build_update_context(&logs, self.config.recent_entries, question);

        tracing::info!(entries = logs.len(), "Requesting dashboard update");
        let answer = self
            .generator
            .generate_response(&context, UserRole::Child, &[])
            .await;

        *self.last_update_slot() = Some(answer.clone());
        Some(answer)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::Segment;
    use crate::log_store::{log_store, LogWriter};
    use crate::mock::MockBackend;
    use eldercare_core::types::Media;
    use std::sync::Arc;

    fn loc(lat: f64, lng: f64) -> Option<GeoLocation> {
        Some(GeoLocation::new(lat, lng))
    }

    fn dashboard(backend: Arc<MockBackend>) -> (ChildDashboard, LogWriter) {
        let (writer, reader) = log_store();
        (
            ChildDashboard::new(ResponseGenerator::new(backend), reader),
            writer,
        )
    }

    // ---- Derivations ----

    #[test]
    fn test_last_location_most_recent_wins() {
        let logs = vec![
            Message::user("a", None, loc(1.0, 1.0)),
            Message::user("b", None, None),
            Message::user("c", None, loc(2.0, 2.0)),
        ];
        assert_eq!(last_location(&logs), loc(2.0, 2.0));
    }

    #[test]
    fn test_last_location_skips_trailing_entries_without_location() {
        let logs = vec![
            Message::user("a", None, loc(1.0, 1.0)),
            Message::user("b", None, None),
        ];
        assert_eq!(last_location(&logs), loc(1.0, 1.0));
        assert_eq!(last_location(&[]), None);
    }

    #[test]
    fn test_media_count() {
        let media = Media::encode(b"x", "image/png").unwrap();
        let logs = vec![
            Message::user("a", Some(media.clone()), None),
            Message::user("b", None, None),
            Message::user("c", Some(media), None),
        ];
        assert_eq!(media_count(&logs), 2);
    }

    #[test]
    fn test_recent_entries_newest_first() {
        let logs: Vec<_> = (0..7)
            .map(|i| Message::user(format!("m{}", i), None, None))
            .collect();
        let recent: Vec<_> = recent_entries(&logs, 5)
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(recent, vec!["m6", "m5", "m4", "m3", "m2"]);
    }

    #[test]
    fn test_update_context_format() {
        let logs: Vec<_> = (0..7)
            .map(|i| Message::user(format!("m{}", i), None, None))
            .collect();
        let ctx = build_update_context(&logs, 5, "How is Dad?");
        assert_eq!(
            ctx,
            "Activity Log:\nParent: m2\nParent: m3\nParent: m4\nParent: m5\nParent: m6\n\nQuestion: How is Dad?"
        );
    }

    #[test]
    fn test_update_context_short_log() {
        let logs = vec![Message::assistant("hi")];
        let ctx = build_update_context(&logs, 5, "q");
        assert_eq!(ctx, "Activity Log:\nElderCare: hi\n\nQuestion: q");
        assert_eq!(build_update_context(&[], 5, "q"), "Activity Log:\n\n\nQuestion: q");
    }

    // ---- Summary ----

    #[test]
    fn test_summary_tracks_log() {
        let (dash, writer) = dashboard(Arc::new(MockBackend::echo()));
        assert_eq!(dash.summary().entries, 0);

        writer.append(Message::user("here", None, loc(3.0, 4.0)));
        let summary = dash.summary();
        assert_eq!(summary.entries, 1);
        assert_eq!(summary.last_location, loc(3.0, 4.0));
        assert_eq!(summary.timeline.len(), 1);

        writer.append(Message::user("again", None, None));
        assert_eq!(dash.summary().entries, 2);
        assert_eq!(dash.summary().timeline[0].content, "again");
    }

    #[test]
    fn test_medicine_compliance() {
        let (dash, writer) = dashboard(Arc::new(MockBackend::echo()));
        writer.append(Message::user("took my medicine", None, None));
        writer.append(Message::user("forgot my pills", None, None));
        writer.append(Message::user("took my tablets after lunch", None, None));
        writer.append(Message::user("hello", None, None));

        let c = dash.medicine_compliance();
        assert_eq!(c.taken, 2);
        assert_eq!(c.missed, 1);
        assert_eq!(c.reported(), 3);
    }

    // ---- request_update ----

    #[tokio::test]
    async fn test_request_update_single_turn_child_persona() {
        let backend = Arc::new(MockBackend::reply("All good. Suggest evening call."));
        let (dash, writer) = dashboard(backend.clone());
        writer.append(Message::user("took my medicine", None, None));

        let answer = dash.request_update(None).await;
        assert_eq!(answer.as_deref(), Some("All good. Suggest evening call."));
        assert_eq!(dash.last_update(), answer);

        let req = backend.last_request().unwrap();
        assert_eq!(
            req.system_instruction,
            eldercare_core::prompts::CHILD_SYSTEM_INSTRUCTION
        );
        assert_eq!(req.turns.len(), 1);
        assert_eq!(
            req.turns[0].segments,
            vec![Segment::Text(
                "Activity Log:\nParent: took my medicine\n\nQuestion: What is today's status?"
                    .to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_request_update_custom_query() {
        let backend = Arc::new(MockBackend::echo());
        let (dash, _writer) = dashboard(backend);
        let answer = dash.request_update(Some("Did Dad walk?")).await.unwrap();
        assert!(answer.ends_with("Question: Did Dad walk?"));

        let answer = dash.request_update(Some("   ")).await.unwrap();
        assert!(answer.ends_with("Question: What is today's status?"));
    }

    #[tokio::test]
    async fn test_request_update_while_pending_is_noop() {
        let backend = Arc::new(MockBackend::reply("status").gated());
        let (dash, _writer) = dashboard(backend.clone());
        let dash = Arc::new(dash);

        let first = {
            let dash = Arc::clone(&dash);
            tokio::spawn(async move { dash.request_update(None).await })
        };
        backend.wait_for_calls(1).await;
        assert!(dash.is_busy());

        assert_eq!(dash.request_update(Some("again?")).await, None);
        assert_eq!(backend.call_count(), 1);

        backend.release();
        assert_eq!(first.await.unwrap().as_deref(), Some("status"));
        assert!(!dash.is_busy());

        backend.release();
        assert!(dash.request_update(None).await.is_some());
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn test_request_update_failure_still_answers() {
        let (dash, _writer) = dashboard(Arc::new(MockBackend::failing()));
        let answer = dash.request_update(None).await.unwrap();
        assert_eq!(answer, crate::generator::CONNECTION_ERROR_FALLBACK);
        assert!(!dash.is_busy());
    }
}
