//! User-facing message channel
//!
//! Filters report progress and notes through a [`MessageHandler`] while they
//! run. Messages are a side channel; they never change a filter's result.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, error, info, warn};

/// Category of a [`Message`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// General information
    Info,
    /// Developer detail
    Debug,
    /// Progress update
    Progress,
    /// Non-fatal problem
    Warning,
    /// Fatal problem (also reported as a diagnostic)
    Error,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            MessageKind::Info => "info",
            MessageKind::Debug => "debug",
            MessageKind::Progress => "progress",
            MessageKind::Warning => "warning",
            MessageKind::Error => "error",
        };
        f.write_str(text)
    }
}

/// One message from a running filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Category
    pub kind: MessageKind,
    /// Text shown to the user
    pub text: String,
}

impl Message {
    /// Create a message
    pub fn new(kind: MessageKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Receiver of filter messages; called from worker threads too
pub trait MessageHandler: Send + Sync {
    /// Handle one message
    fn handle(&self, message: Message);
}

impl<F> MessageHandler for F
where
    F: Fn(Message) + Send + Sync,
{
    fn handle(&self, message: Message) {
        self(message)
    }
}

/// Keeps every message, in arrival order
#[derive(Debug, Default)]
pub struct CollectingHandler {
    messages: Mutex<Vec<Message>>,
}

impl CollectingHandler {
    /// Empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything received so far
    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().clone()
    }

    /// Texts of messages of one kind
    pub fn texts(&self, kind: MessageKind) -> Vec<String> {
        self.messages
            .lock()
            .iter()
            .filter(|m| m.kind == kind)
            .map(|m| m.text.clone())
            .collect()
    }

    /// Drain everything received so far
    pub fn take(&self) -> Vec<Message> {
        std::mem::take(&mut *self.messages.lock())
    }
}

impl MessageHandler for CollectingHandler {
    fn handle(&self, message: Message) {
        self.messages.lock().push(message);
    }
}

/// Forwards messages to `tracing` under the `structura::pipeline` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingHandler;

impl MessageHandler for TracingHandler {
    fn handle(&self, message: Message) {
        match message.kind {
            MessageKind::Info => info!(target: "structura::pipeline", "{}", message.text),
            MessageKind::Debug | MessageKind::Progress => {
                debug!(target: "structura::pipeline", kind = %message.kind, "{}", message.text)
            }
            MessageKind::Warning => warn!(target: "structura::pipeline", "{}", message.text),
            MessageKind::Error => error!(target: "structura::pipeline", "{}", message.text),
        }
    }
}
