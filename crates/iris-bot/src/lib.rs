pub mod command;
pub mod context;
pub mod event;
pub mod message;
pub mod metrics;
pub mod runner;

use image::RgbImage;
use serde_json::Value;

pub use command::{FatalError, Lifecycle};
pub use context::BotContext;
pub use message::{CollectSink, MessageKind, MessageSink, StdoutSink};

/// A pluggable analysis bot: one detection pipeline plus its command
/// protocol, driven by serial host callbacks.
///
/// Implementations may be stateful across frames (background models, loaded
/// classifiers), hence `&mut self`. The host never invokes the two callbacks
/// concurrently for one instance.
pub trait AnalysisBot {
    /// Handle one decoded frame. The frame is borrowed for the duration of
    /// the call only. Un-processable frames are skipped, never escalated.
    fn process_image(&mut self, ctx: &mut BotContext, frame: &RgbImage);

    /// Handle one control document. `Ok(Some(_))` is published back on the
    /// control channel; `Err` is a fatal configuration error that terminates
    /// the process.
    fn process_command(
        &mut self,
        ctx: &mut BotContext,
        command: &Value,
    ) -> Result<Option<Value>, FatalError>;
}
