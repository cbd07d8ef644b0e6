use image::RgbImage;
use prometheus::{Counter, Histogram, Registry};
use serde_json::Value;
use tracing::{error, info};

use iris_bot::command;
use iris_bot::event::{Detection, EventMapper};
use iris_bot::metrics::{measure, register_counter, register_stage_histogram};
use iris_bot::{AnalysisBot, BotContext, FatalError, Lifecycle, MessageKind};
use iris_vision::classifier::Classifier;
use iris_vision::ops;

struct Tagged {
    classifier: Classifier,
    tag: String,
}

struct Panel {
    frames: Counter,
    detections: Counter,
    detect_time: Histogram,
}

impl Panel {
    fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        Ok(Self {
            frames: register_counter(registry, "frames", "Frames seen.")?,
            detections: register_counter(registry, "detections", "Detections emitted.")?,
            detect_time: register_stage_histogram(
                registry,
                "cascade_detect_times_millis",
                "Classifier scan latency per frame.",
            )?,
        })
    }
}

struct CascadeState {
    classifiers: Vec<Tagged>,
    mapper: EventMapper,
    panel: Panel,
}

/// Multi-classifier detector with the strict protocol: one `configure`
/// command loads every descriptor named in `body`, and that is the only
/// command that ever mutates the instance.
///
/// Configuration body is a map of `descriptor file -> tag` pairs:
///
/// ```json
/// { "action": "configure", "body": { "faces.json": "face", "plates.json": "plate" } }
/// ```
pub struct CascadeBot {
    state: Lifecycle<CascadeState>,
}

impl CascadeBot {
    pub fn new() -> Self {
        Self { state: Lifecycle::new() }
    }

    fn load_classifiers(
        ctx: &BotContext,
        body: &serde_json::Map<String, Value>,
    ) -> Result<Vec<Tagged>, FatalError> {
        let mut classifiers = Vec::with_capacity(body.len());
        for (file, tag) in body {
            let Some(tag) = tag.as_str() else {
                // Validated by the caller; kept as a guard for direct use.
                continue;
            };
            let path = ctx.models_dir().join(file);
            let classifier =
                Classifier::load(&path).map_err(|source| FatalError::ClassifierLoad {
                    path: path.display().to_string(),
                    source,
                })?;
            classifiers.push(Tagged {
                classifier,
                tag: tag.to_string(),
            });
        }
        Ok(classifiers)
    }
}

impl Default for CascadeBot {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisBot for CascadeBot {
    fn process_image(&mut self, ctx: &mut BotContext, frame: &RgbImage) {
        let Some(state) = self.state.get_mut() else {
            return;
        };

        state.panel.frames.inc();
        let (width, height) = frame.dimensions();
        let gray = ops::to_luma(frame);

        let classifiers = &state.classifiers;
        let detections: Vec<Detection> = measure(&state.panel.detect_time, || {
            classifiers
                .iter()
                .flat_map(|t| {
                    t.classifier
                        .detect(&gray)
                        .into_iter()
                        .map(|rect| Detection::new(rect, t.tag.clone()))
                })
                .collect()
        });

        if detections.is_empty() {
            return;
        }

        state.panel.detections.inc_by(detections.len() as f64);
        if let Some(event) = state.mapper.analysis(&detections, width, height) {
            ctx.emit(MessageKind::Analysis, event);
        }
    }

    fn process_command(
        &mut self,
        ctx: &mut BotContext,
        command: &Value,
    ) -> Result<Option<Value>, FatalError> {
        if !command.is_object() {
            error!("cascade: unsupported command: {}", command);
            return Ok(None);
        }

        match command::action(command) {
            Some("configure") => {}
            _ => {
                error!("cascade: unsupported command: {}", command);
                return Ok(None);
            }
        }

        let body = match command.get("body").and_then(Value::as_object) {
            Some(body) if !body.is_empty() && body.values().all(Value::is_string) => body,
            _ => {
                error!("cascade: rejecting configure with missing or empty body: {}", command);
                return Ok(None);
            }
        };

        let registry = ctx.registry.clone();
        self.state.configure_once(|| {
            Ok(CascadeState {
                classifiers: Self::load_classifiers(ctx, body)?,
                mapper: EventMapper::new(),
                panel: Panel::register(&registry)?,
            })
        })?;

        info!("cascade: bot initialized with {} classifier(s)", body.len());
        Ok(None)
    }
}
