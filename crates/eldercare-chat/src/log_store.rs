//! Append-only log shared between the parent conversation and the dashboard.
//!
//! One writer, many readers. The writer half goes to the parent controller;
//! reader halves go to whoever renders the log. Every append bumps a revision
//! number that readers can watch.

use std::sync::{Arc, PoisonError, RwLock};

use eldercare_core::types::Message;
use tokio::sync::watch;

struct LogInner {
    entries: RwLock<Vec<Message>>,
    revision: watch::Sender<u64>,
}

/// Create an empty log, returning its single writer and a reader.
pub fn log_store() -> (LogWriter, LogReader) {
    let (revision, _) = watch::channel(0);
    let inner = Arc::new(LogInner {
        entries: RwLock::new(Vec::new()),
        revision,
    });
    (
        LogWriter {
            inner: Arc::clone(&inner),
        },
        LogReader { inner },
    )
}

/// Append capability. Deliberately not `Clone`.
pub struct LogWriter {
    inner: Arc<LogInner>,
}

impl LogWriter {
    pub fn append(&self, message: Message) {
        let len = {
            let mut entries = self
                .inner
                .entries
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            entries.push(message);
            entries.len()
        };
        self.inner.revision.send_modify(|rev| *rev += 1);
        tracing::debug!(entries = len, "Log entry appended");
    }

    /// A reader over the same log.
    pub fn reader(&self) -> LogReader {
        LogReader {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Read-only view of the log.
#[derive(Clone)]
pub struct LogReader {
    inner: Arc<LogInner>,
}

impl LogReader {
    /// Copy of all entries in append order.
    pub fn snapshot(&self) -> Vec<Message> {
        self.inner
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.inner
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of appends so far.
    pub fn revision(&self) -> u64 {
        *self.inner.revision.borrow()
    }

    /// Receiver that wakes on every append.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }
}
