use deployq_core::{Coordinator, Severity};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Something the coordinator told the outside world.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueueEvent {
    Notification {
        user: String,
        message: String,
        severity: Severity,
    },
    Subject {
        subject: String,
    },
}

impl QueueEvent {
    pub fn name(&self) -> &'static str {
        match self {
            QueueEvent::Notification { .. } => "notification",
            QueueEvent::Subject { .. } => "subject",
        }
    }
}

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    pub event_tx: broadcast::Sender<QueueEvent>,
}

impl AppState {
    /// Wrap `coordinator` and forward everything its sink publishes onto the
    /// event channel.
    pub fn new(coordinator: Arc<Coordinator>) -> Self {
        let (tx, _) = broadcast::channel(64);

        let notify_tx = tx.clone();
        coordinator
            .sink()
            .add_notification_callback(move |user, message, severity| {
                // No subscribers is fine.
                let _ = notify_tx.send(QueueEvent::Notification {
                    user: user.to_string(),
                    message: message.to_string(),
                    severity,
                });
            });
        let subject_tx = tx.clone();
        coordinator.sink().add_subject_callback(move |subject| {
            let _ = subject_tx.send(QueueEvent::Subject {
                subject: subject.to_string(),
            });
        });

        Self {
            coordinator,
            event_tx: tx,
        }
    }
}
