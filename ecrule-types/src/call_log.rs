//! Ordered record of lifecycle callbacks.
//!
//! Editing contexts, rules and model loaders push a [`LifecycleEvent`] into a
//! shared [`CallLog`] every time one of their lifecycle operations runs. Tests
//! then assert on call counts and relative ordering instead of intercepting
//! method calls at runtime.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A single lifecycle callback.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "event", content = "model", rename_all = "snake_case")]
pub enum LifecycleEvent {
    Before,
    Evaluate,
    After,
    Lock,
    Unlock,
    Revert,
    SaveChanges,
    Dispose,
    LoadModel(String),
    UnloadModel(String),
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Before => f.write_str("before"),
            Self::Evaluate => f.write_str("evaluate"),
            Self::After => f.write_str("after"),
            Self::Lock => f.write_str("lock"),
            Self::Unlock => f.write_str("unlock"),
            Self::Revert => f.write_str("revert"),
            Self::SaveChanges => f.write_str("save_changes"),
            Self::Dispose => f.write_str("dispose"),
            Self::LoadModel(name) => write!(f, "load_model({name})"),
            Self::UnloadModel(name) => write!(f, "unload_model({name})"),
        }
    }
}

/// Shared, append-only log of [`LifecycleEvent`]s.
///
/// Cloning a `CallLog` yields another handle onto the same log.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    events: Arc<Mutex<Vec<LifecycleEvent>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, Vec<LifecycleEvent>> {
        // A panicking test body must not make the log unreadable for the
        // assertions that follow it.
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, event: LifecycleEvent) {
        self.guard().push(event);
    }

    /// Returns a snapshot of every event recorded so far, oldest first.
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.guard().clone()
    }

    /// Number of times `event` was recorded.
    pub fn count(&self, event: &LifecycleEvent) -> usize {
        self.guard().iter().filter(|e| *e == event).count()
    }

    /// Index of the first occurrence of `event`.
    pub fn position(&self, event: &LifecycleEvent) -> Option<usize> {
        self.guard().iter().position(|e| e == event)
    }

    /// Returns `true` if `expected` appears in the log as a subsequence,
    /// i.e. in this relative order but not necessarily adjacent.
    pub fn contains_in_order(&self, expected: &[LifecycleEvent]) -> bool {
        let events = self.guard();
        let mut remaining = expected.iter().peekable();
        for event in events.iter() {
            if remaining.peek() == Some(&event) {
                remaining.next();
            }
        }
        remaining.peek().is_none()
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    pub fn clear(&self) {
        self.guard().clear();
    }
}
