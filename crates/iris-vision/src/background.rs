use image::{GrayImage, ImageBuffer, Luma};

type ModelPlane = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Per-pixel running-average background model.
///
/// Keeps an exponential moving average of the luma plane and marks pixels
/// whose distance from the average exceeds `diff_threshold` as foreground.
/// The model persists across frames; a frame whose dimensions differ from
/// the learned plane re-seeds the model instead of failing.
pub struct BackgroundModel {
    alpha: f32,
    diff_threshold: f32,
    model: Option<ModelPlane>,
}

impl BackgroundModel {
    /// `history` controls how quickly the average adapts (larger = slower),
    /// mirroring the history parameter of the usual subtractor APIs.
    pub fn new(history: u32, diff_threshold: f32) -> Self {
        Self {
            alpha: 1.0 / history.max(1) as f32,
            diff_threshold,
            model: None,
        }
    }

    /// Update the model with `frame` and return the binary foreground mask
    /// (255 = foreground). The first frame after a (re-)seed yields an empty
    /// mask: there is no history to diff against yet.
    pub fn apply(&mut self, frame: &GrayImage) -> GrayImage {
        let (w, h) = frame.dimensions();

        let needs_seed = match &self.model {
            Some(m) => m.dimensions() != (w, h),
            None => true,
        };
        if needs_seed {
            let mut plane = ModelPlane::new(w, h);
            for (dst, src) in plane.iter_mut().zip(frame.as_raw().iter()) {
                *dst = f32::from(*src);
            }
            self.model = Some(plane);
            return GrayImage::new(w, h);
        }

        let Some(model) = self.model.as_mut() else {
            return GrayImage::new(w, h);
        };
        let mut mask = GrayImage::new(w, h);
        for ((out, avg), src) in mask
            .iter_mut()
            .zip(model.iter_mut())
            .zip(frame.as_raw().iter())
        {
            let p = f32::from(*src);
            if (p - *avg).abs() > self.diff_threshold {
                *out = 255;
            }
            *avg += self.alpha * (p - *avg);
        }
        mask
    }

    pub fn reset(&mut self) {
        self.model = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(w: u32, h: u32, v: u8) -> GrayImage {
        GrayImage::from_pixel(w, h, Luma([v]))
    }

    #[test]
    fn first_frame_yields_empty_mask() {
        let mut bg = BackgroundModel::new(500, 24.0);
        let mask = bg.apply(&flat(8, 8, 30));
        assert!(mask.as_raw().iter().all(|&p| p == 0));
    }

    #[test]
    fn static_scene_stays_background() {
        let mut bg = BackgroundModel::new(500, 24.0);
        for _ in 0..5 {
            let mask = bg.apply(&flat(8, 8, 30));
            assert!(mask.as_raw().iter().all(|&p| p == 0));
        }
    }

    #[test]
    fn bright_patch_becomes_foreground() {
        let mut bg = BackgroundModel::new(500, 24.0);
        bg.apply(&flat(16, 16, 30));
        bg.apply(&flat(16, 16, 30));

        let mut moved = flat(16, 16, 30);
        for y in 4..8 {
            for x in 4..8 {
                moved.put_pixel(x, y, Luma([220]));
            }
        }
        let mask = bg.apply(&moved);
        assert_eq!(mask.get_pixel(5, 5)[0], 255);
        assert_eq!(mask.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn dimension_change_reseeds_instead_of_failing() {
        let mut bg = BackgroundModel::new(500, 24.0);
        bg.apply(&flat(8, 8, 30));
        let mask = bg.apply(&flat(12, 10, 200));
        assert_eq!(mask.dimensions(), (12, 10));
        assert!(mask.as_raw().iter().all(|&p| p == 0));
    }
}
