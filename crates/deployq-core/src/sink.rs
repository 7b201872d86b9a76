//! Outbound notification and subject callbacks.
//!
//! The coordinator never talks to a chat service itself. Transports register
//! callbacks here; the coordinator invokes every one of them and moves on.
//! Callbacks run inline on the tick task, so anything that does I/O should
//! hand the work to its own task and return immediately.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
        };
        f.write_str(s)
    }
}

pub type NotificationCallback = Arc<dyn Fn(&str, &str, Severity) + Send + Sync>;
pub type SubjectCallback = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Default, Clone)]
pub struct Sink {
    notifiers: Arc<RwLock<Vec<NotificationCallback>>>,
    subjects: Arc<RwLock<Vec<SubjectCallback>>>,
}

impl Sink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_notification_callback<F>(&self, f: F)
    where
        F: Fn(&str, &str, Severity) + Send + Sync + 'static,
    {
        self.notifiers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(Arc::new(f));
    }

    pub fn add_subject_callback<F>(&self, f: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.subjects
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(Arc::new(f));
    }

    /// Deliver `message` for `user` to every notification callback.
    pub fn notify(&self, user: &str, message: &str, severity: Severity) {
        // Clone the list out so a callback may register another callback.
        let callbacks = self
            .notifiers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for cb in callbacks {
            cb(user, message, severity);
        }
    }

    pub fn set_subject(&self, subject: &str) {
        let callbacks = self
            .subjects
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for cb in callbacks {
            cb(subject);
        }
    }

    /// Route notifications and subject changes to the tracing log.
    pub fn with_logging(self) -> Self {
        self.add_notification_callback(|user, message, severity| match severity {
            Severity::High => tracing::warn!(user = %user, %severity, "{message}"),
            _ => tracing::info!(user = %user, %severity, "{message}"),
        });
        self.add_subject_callback(|subject| tracing::info!(subject = %subject, "subject changed"));
        self
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.notifiers.read().map(|v| v.len()).unwrap_or(0);
        let s = self.subjects.read().map(|v| v.len()).unwrap_or(0);
        f.debug_struct("Sink")
            .field("notifiers", &n)
            .field("subjects", &s)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn empty_sink_is_noop() {
        let sink = Sink::new();
        sink.notify("alice", "you're up!", Severity::Low);
        sink.set_subject("anything");
    }

    #[test]
    fn every_callback_is_invoked() {
        let sink = Sink::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in ["a", "b"] {
            let seen = seen.clone();
            sink.add_notification_callback(move |user, msg, sev| {
                seen.lock()
                    .unwrap()
                    .push(format!("{tag}:{user}:{msg}:{sev}"));
            });
        }
        sink.notify("alice", "hi", Severity::High);
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["a:alice:hi:HIGH", "b:alice:hi:HIGH"]
        );
    }

    #[test]
    fn clones_share_registrations() {
        let sink = Sink::new();
        let clone = sink.clone();
        let subjects = Arc::new(Mutex::new(Vec::new()));
        let s = subjects.clone();
        clone.add_subject_callback(move |subject| s.lock().unwrap().push(subject.to_string()));
        sink.set_subject("new subject");
        assert_eq!(*subjects.lock().unwrap(), vec!["new subject"]);
    }

    #[test]
    fn severity_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Severity::Medium).unwrap(), "\"MEDIUM\"");
    }
}
