//! Notifications emitted by builder and preview sessions.

use serde::Serialize;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AssessmentEvent {
    DraftSaved { job_id: String },
    Saved { job_id: String },
    SaveFailed { job_id: String, message: String },
    Submitted { job_id: String, submission_id: String },
    SubmitFailed { job_id: String, message: String },
    /// A completion arrived after a newer request was issued and was dropped.
    StaleCompletion { job_id: String, token: u64 },
}

impl AssessmentEvent {
    pub fn job_id(&self) -> &str {
        match self {
            AssessmentEvent::DraftSaved { job_id }
            | AssessmentEvent::Saved { job_id }
            | AssessmentEvent::SaveFailed { job_id, .. }
            | AssessmentEvent::Submitted { job_id, .. }
            | AssessmentEvent::SubmitFailed { job_id, .. }
            | AssessmentEvent::StaleCompletion { job_id, .. } => job_id,
        }
    }
}

/// Broadcasts session events to any number of subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AssessmentEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn publish(&self, event: AssessmentEvent) {
        // no subscribers is fine
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AssessmentEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
