mod params;

use image::RgbImage;
use prometheus::{Counter, Histogram, Registry};
use serde_json::{json, Value};
use tracing::{debug, error, info};

use iris_bot::command;
use iris_bot::event::{Detection, EventMapper};
use iris_bot::metrics::{measure, register_counter, register_stage_histogram};
use iris_bot::{AnalysisBot, BotContext, FatalError, Lifecycle, MessageKind};
use iris_vision::background::BackgroundModel;
use iris_vision::ops;

pub use params::Parameters;

const BLUR_SIGMA: f32 = 1.2;
const BACKGROUND_HISTORY: u32 = 500;
const FOREGROUND_DIFF_THRESHOLD: f32 = 24.0;

struct Panel {
    frames: Counter,
    detections: Counter,
    blur_time: Histogram,
    extract_time: Histogram,
    morph_time: Histogram,
    contours_time: Histogram,
}

impl Panel {
    fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        Ok(Self {
            frames: register_counter(registry, "frames", "Frames seen.")?,
            detections: register_counter(registry, "detections", "Detections emitted.")?,
            blur_time: register_stage_histogram(
                registry,
                "motion_detector_blur_times_millis",
                "Smoothing stage latency.",
            )?,
            extract_time: register_stage_histogram(
                registry,
                "motion_detector_extract_times_millis",
                "Foreground extraction stage latency.",
            )?,
            morph_time: register_stage_histogram(
                registry,
                "motion_detector_morph_times_millis",
                "Morphological filter stage latency.",
            )?,
            contours_time: register_stage_histogram(
                registry,
                "motion_detector_contours_times_millis",
                "Contour extraction stage latency.",
            )?,
        })
    }
}

struct MotionState {
    params: Parameters,
    background: BackgroundModel,
    mapper: EventMapper,
    panel: Panel,
}

impl MotionState {
    fn new(registry: &Registry) -> Result<Self, FatalError> {
        Ok(Self {
            params: Parameters::default(),
            background: BackgroundModel::new(BACKGROUND_HISTORY, FOREGROUND_DIFF_THRESHOLD),
            mapper: EventMapper::new(),
            panel: Panel::register(registry)?,
        })
    }
}

/// Background-subtraction motion detector.
///
/// Relaxed protocol: the first command of any shape materializes instance
/// state (including metrics, so stage timers exist before the first frame);
/// `{"params": {...}}` merges into the parameter store and is acknowledged.
pub struct MotionBot {
    state: Lifecycle<MotionState>,
}

impl MotionBot {
    pub fn new() -> Self {
        Self { state: Lifecycle::new() }
    }
}

impl Default for MotionBot {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisBot for MotionBot {
    fn process_image(&mut self, ctx: &mut BotContext, frame: &RgbImage) {
        let Some(state) = self.state.get_mut() else {
            debug!("motion: dropping frame received before first command");
            return;
        };

        state.panel.frames.inc();
        let (width, height) = frame.dimensions();
        let gray = ops::to_luma(frame);

        let blurred = measure(&state.panel.blur_time, || ops::smooth(&gray, BLUR_SIGMA));
        let mask = measure(&state.panel.extract_time, || {
            state.background.apply(&blurred)
        });
        let morphed = measure(&state.panel.morph_time, || {
            ops::open_mask(&mask, state.params.feature_size)
        });
        let rects = measure(&state.panel.contours_time, || {
            ops::outer_bounding_rects(&morphed)
        });

        if rects.is_empty() {
            return;
        }

        state.panel.detections.inc_by(rects.len() as f64);
        let detections: Vec<Detection> = rects
            .into_iter()
            .map(|rect| Detection::new(rect, "motion"))
            .collect();
        if let Some(event) = state.mapper.analysis(&detections, width, height) {
            ctx.emit(MessageKind::Analysis, event);
        }
    }

    fn process_command(
        &mut self,
        ctx: &mut BotContext,
        command: &Value,
    ) -> Result<Option<Value>, FatalError> {
        let registry = ctx.registry.clone();
        let first_contact = !self.state.is_configured();
        let state = self.state.get_or_init(|| MotionState::new(&registry))?;
        if first_contact {
            info!("motion: bot initialized");
        }

        if !command.is_object() {
            error!("motion: unsupported command: {}", command);
            return Ok(None);
        }

        let Some(params) = command.get("params") else {
            error!("motion: unsupported command");
            return Ok(None);
        };

        info!("motion: received params command: {}", command);
        state.params.merge_json(params);

        // Acknowledge with the applied values so the sender can correlate.
        let mut ack = state.params.to_json();
        ack["ack"] = json!(true);
        if let Some(sender) = command::sender(command) {
            ack["to"] = json!(sender);
        }
        Ok(Some(ack))
    }
}
