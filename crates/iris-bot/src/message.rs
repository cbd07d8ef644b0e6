use std::sync::{Arc, Mutex};

use serde_json::Value;

/// Kinds of outbound documents, mirroring the host's channel split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Per-frame detection results.
    Analysis,
    /// Command acknowledgments, visible to other control-channel parties.
    Control,
    /// Diagnostic output.
    Debug,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Analysis => "analysis",
            MessageKind::Control => "control",
            MessageKind::Debug => "debug",
        }
    }
}

/// Where emitted documents go. The real host supplies its own transport;
/// the process adapter uses [`StdoutSink`].
pub trait MessageSink {
    fn publish(&mut self, kind: MessageKind, document: Value);
}

/// One JSON line per message on stdout.
pub struct StdoutSink;

impl MessageSink for StdoutSink {
    fn publish(&mut self, kind: MessageKind, document: Value) {
        println!(
            "{}",
            serde_json::json!({ "kind": kind.as_str(), "body": document })
        );
    }
}

/// Sink that buffers messages for inspection; shared handles observe the
/// same buffer, so tests keep one clone and hand the other to the context.
#[derive(Clone, Default)]
pub struct CollectSink {
    messages: Arc<Mutex<Vec<(MessageKind, Value)>>>,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<(MessageKind, Value)> {
        std::mem::take(&mut self.messages.lock().unwrap())
    }

    pub fn len(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MessageSink for CollectSink {
    fn publish(&mut self, kind: MessageKind, document: Value) {
        self.messages.lock().unwrap().push((kind, document));
    }
}
