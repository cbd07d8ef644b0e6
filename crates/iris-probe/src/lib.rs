use image::RgbImage;
use serde_json::{json, Value};
use tracing::info;

use iris_bot::{AnalysisBot, BotContext, FatalError, MessageKind};

/// Wiring probe: reports every frame's dimensions on the debug channel and
/// answers no commands. Deploy it to verify decode and transport before
/// pointing a real pipeline at a stream.
pub struct ProbeBot;

impl AnalysisBot for ProbeBot {
    fn process_image(&mut self, ctx: &mut BotContext, frame: &RgbImage) {
        let (width, height) = frame.dimensions();
        ctx.emit(
            MessageKind::Debug,
            json!({ "width": width, "height": height }),
        );
    }

    fn process_command(
        &mut self,
        _ctx: &mut BotContext,
        command: &Value,
    ) -> Result<Option<Value>, FatalError> {
        info!("probe: libraries are ok, ignoring command: {}", command);
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use iris_bot::CollectSink;
    use serde_json::json;

    #[test]
    fn reports_dimensions_per_frame() {
        let sink = CollectSink::new();
        let mut ctx = BotContext::new(Box::new(sink.clone()));
        let mut bot = ProbeBot;

        bot.process_image(&mut ctx, &RgbImage::from_pixel(320, 240, Rgb([0, 0, 0])));
        bot.process_image(&mut ctx, &RgbImage::from_pixel(64, 48, Rgb([0, 0, 0])));

        let messages = sink.take();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].0, MessageKind::Debug);
        assert_eq!(messages[0].1, json!({"width": 320, "height": 240}));
        assert_eq!(messages[1].1, json!({"width": 64, "height": 48}));
    }

    #[test]
    fn commands_are_acknowledged_with_silence() {
        let sink = CollectSink::new();
        let mut ctx = BotContext::new(Box::new(sink.clone()));
        let mut bot = ProbeBot;
        assert!(bot
            .process_command(&mut ctx, &json!({"action": "configure"}))
            .unwrap()
            .is_none());
        assert!(sink.is_empty());
    }
}
