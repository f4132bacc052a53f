//! Live progress events for external observers.
//!
//! Delivery is best-effort: `emit` never blocks, an event with no subscriber
//! is simply dropped, and a slow subscriber loses the oldest events. The
//! durable record lives in the audit log, not here.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Events pushed to observers while the agent works.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveEvent {
    /// Text produced by the model.
    AssistantMessage { text: String },

    /// A tool is about to run.
    ToolStatus { tool: String, label: String },

    /// Slide images were re-rendered.
    SlidesUpdated { slides: Vec<String> },

    /// The current turn failed.
    Error { message: String },
}

impl LiveEvent {
    /// Event name observers subscribe to.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AssistantMessage { .. } => "ai-message",
            Self::ToolStatus { .. } => "ai-status",
            Self::SlidesUpdated { .. } => "slides-updated",
            Self::Error { .. } => "ai-error",
        }
    }

    /// The single string payload carried by the event.
    pub fn payload(&self) -> String {
        match self {
            Self::AssistantMessage { text } => text.clone(),
            Self::ToolStatus { label, .. } => format!("*{label}...*"),
            Self::SlidesUpdated { slides } => slides.join("\n"),
            Self::Error { message } => message.clone(),
        }
    }
}

/// A broadcast-based channel for live events.
///
/// Uses `tokio::sync::broadcast` so any number of observers can subscribe.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Arc<LiveEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Push an event to all current subscribers.
    pub fn emit(&self, event: LiveEvent) {
        // No subscribers is fine.
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<LiveEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
