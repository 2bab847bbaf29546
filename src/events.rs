//! Registration change notifications.
//!
//! Reviewers and waiting schools subscribe instead of re-reading the
//! registration list on a timer. Delivery is best-effort: a subscriber whose
//! receiver is gone is dropped on the next emit.

use crate::model::RegistrationStatus;
use serde::Serialize;
use std::sync::mpsc::{channel, Receiver, Sender};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RegistrationEvent {
    #[serde(rename_all = "camelCase")]
    Submitted {
        registration_id: String,
        school_name: String,
        pending_count: usize,
    },
    #[serde(rename_all = "camelCase")]
    StatusChanged {
        registration_id: String,
        status: RegistrationStatus,
        pending_count: usize,
    },
}

#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<RegistrationEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<RegistrationEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn emit(&mut self, event: RegistrationEvent) {
        tracing::debug!(?event, subscribers = self.subscribers.len(), "registration event");
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
