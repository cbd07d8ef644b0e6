use serde_json::{json, Value};

use iris_vision::PixelRect;

/// One pipeline hit: a pixel-space rectangle plus the label of whatever
/// produced it.
#[derive(Debug, Clone)]
pub struct Detection {
    pub rect: PixelRect,
    pub tag: String,
}

impl Detection {
    pub fn new(rect: PixelRect, tag: impl Into<String>) -> Self {
        Self { rect, tag: tag.into() }
    }
}

/// Converts detection batches into analysis documents.
///
/// Owns the per-instance identifier counter: ids are assigned here, at
/// emission time and in emission order, strictly increasing for the lifetime
/// of the instance and never reused.
pub struct EventMapper {
    next_id: u64,
}

impl EventMapper {
    pub fn new() -> Self {
        Self { next_id: 0 }
    }

    /// Build the analysis document for one frame's detections, or `None`
    /// when there is nothing to report (no signal, no output).
    pub fn analysis(
        &mut self,
        detections: &[Detection],
        frame_width: u32,
        frame_height: u32,
    ) -> Option<Value> {
        if detections.is_empty() {
            return None;
        }

        let objects: Vec<Value> = detections
            .iter()
            .map(|det| {
                let frac = det.rect.to_fractional(frame_width, frame_height);
                let id = self.next_id;
                self.next_id += 1;
                json!({
                    "id": id,
                    "rect": {
                        "x": frac.x,
                        "y": frac.y,
                        "width": frac.width,
                        "height": frac.height,
                    },
                    "tag": det.tag,
                })
            })
            .collect();

        Some(json!({ "detected_objects": objects }))
    }
}

impl Default for EventMapper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_batch_emits_nothing() {
        let mut mapper = EventMapper::new();
        assert!(mapper.analysis(&[], 640, 480).is_none());
        // No ids were burned by the empty batch.
        let ev = mapper
            .analysis(&[Detection::new(PixelRect::new(0, 0, 10, 10), "x")], 640, 480)
            .unwrap();
        assert_eq!(ev["detected_objects"][0]["id"], 0);
    }

    #[test]
    fn first_detection_of_instance_gets_id_zero() {
        let mut mapper = EventMapper::new();
        let dets = [Detection::new(PixelRect::new(960, 540, 100, 50), "motion")];
        let ev = mapper.analysis(&dets, 1920, 1080).unwrap();

        let obj = &ev["detected_objects"][0];
        assert_eq!(obj["id"], 0);
        assert_eq!(obj["tag"], "motion");
        assert!((obj["rect"]["x"].as_f64().unwrap() - 0.5).abs() < 1e-9);
        assert!((obj["rect"]["y"].as_f64().unwrap() - 0.5).abs() < 1e-9);
        assert!((obj["rect"]["width"].as_f64().unwrap() - 0.0521).abs() < 1e-3);
        assert!((obj["rect"]["height"].as_f64().unwrap() - 0.0463).abs() < 1e-3);
    }

    #[test]
    fn ids_increase_across_frames_and_batches() {
        let mut mapper = EventMapper::new();
        let det = |x| Detection::new(PixelRect::new(x, 0, 4, 4), "t");

        let first = mapper.analysis(&[det(0), det(8)], 64, 64).unwrap();
        let second = mapper.analysis(&[det(16)], 64, 64).unwrap();

        let ids: Vec<u64> = first["detected_objects"]
            .as_array()
            .unwrap()
            .iter()
            .chain(second["detected_objects"].as_array().unwrap())
            .map(|o| o["id"].as_u64().unwrap())
            .collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn event_length_matches_input_length() {
        let mut mapper = EventMapper::new();
        let dets: Vec<Detection> = (0..5)
            .map(|i| Detection::new(PixelRect::new(i * 10, 0, 5, 5), "t"))
            .collect();
        let ev = mapper.analysis(&dets, 100, 100).unwrap();
        assert_eq!(ev["detected_objects"].as_array().unwrap().len(), 5);
        for obj in ev["detected_objects"].as_array().unwrap() {
            let r = &obj["rect"];
            for key in ["x", "y", "width", "height"] {
                let v = r[key].as_f64().unwrap();
                assert!((0.0..=1.0).contains(&v));
            }
        }
    }
}
