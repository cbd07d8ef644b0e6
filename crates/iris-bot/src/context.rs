use std::path::{Path, PathBuf};

use prometheus::Registry;
use serde_json::Value;

use crate::message::{MessageKind, MessageSink};

/// Per-process bot context: the metrics registry, the outbound message sink
/// and the directory model resources are resolved against. One context per
/// bot instance, owned for the whole run.
pub struct BotContext {
    pub registry: Registry,
    models_dir: PathBuf,
    sink: Box<dyn MessageSink>,
}

impl BotContext {
    pub fn new(sink: Box<dyn MessageSink>) -> Self {
        Self {
            registry: Registry::new(),
            models_dir: PathBuf::from("models"),
            sink,
        }
    }

    pub fn with_models_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.models_dir = dir.into();
        self
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Publish one document to the host.
    pub fn emit(&mut self, kind: MessageKind, document: Value) {
        self.sink.publish(kind, document);
    }
}
