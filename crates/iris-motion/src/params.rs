use serde_json::{json, Value};
use tracing::error;

/// Runtime-tunable pipeline parameters. Always valid: construction supplies
/// defaults, and merges only ever replace a field with a validated value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameters {
    /// Side of the square structuring element used by the morphological
    /// filter stage, in pixels.
    pub feature_size: u32,
}

impl Default for Parameters {
    fn default() -> Self {
        Self { feature_size: 5 }
    }
}

impl Parameters {
    /// Merge a partial parameter document. Unknown keys are ignored; a
    /// recognized key with an unusable value leaves the current value
    /// untouched rather than aborting the merge.
    pub fn merge_json(&mut self, params: &Value) {
        if !params.is_object() {
            error!("motion: ignoring bad params: {}", params);
            return;
        }

        if let Some(feature_size) = params.get("featureSize") {
            match feature_size.as_u64() {
                Some(v) if v >= 1 && v <= u64::from(u32::MAX) => {
                    self.feature_size = v as u32;
                }
                _ => error!("motion: ignoring bad featureSize: {}", feature_size),
            }
        }
    }

    pub fn to_json(&self) -> Value {
        json!({ "featureSize": self.feature_size })
    }
}
