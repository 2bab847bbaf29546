use std::path::PathBuf;
use std::sync::mpsc::Receiver;

use serde::Deserialize;
use serde_json::json;

use crate::events::{EventBus, RegistrationEvent};
use crate::store::RecordStore;
use crate::summary::SummaryGenerator;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    /// `None` for an ephemeral (in-memory) workspace.
    pub workspace: Option<PathBuf>,
    pub store: Option<Box<dyn RecordStore>>,
    pub events: EventBus,
    /// Set once the client asks for registration events.
    pub event_feed: Option<Receiver<RegistrationEvent>>,
    pub summarizer: Option<Box<dyn SummaryGenerator>>,
}

impl AppState {
    pub fn new(summarizer: Option<Box<dyn SummaryGenerator>>) -> Self {
        Self {
            workspace: None,
            store: None,
            events: EventBus::new(),
            event_feed: None,
            summarizer,
        }
    }

    /// Event lines queued for the client since the last call.
    pub fn drain_events(&mut self) -> Vec<serde_json::Value> {
        let Some(rx) = self.event_feed.as_ref() else {
            return Vec::new();
        };
        rx.try_iter()
            .map(|ev| json!({ "event": "registration", "payload": ev }))
            .collect()
    }
}
