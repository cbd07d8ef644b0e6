use std::path::Path;

use anyhow::{Context, Result};
use image::GrayImage;
use imageproc::integral_image::{integral_image, sum_image_pixels};
use serde::Deserialize;
use tracing::info;

use crate::PixelRect;

/// One weak feature: a sub-rectangle of the detection window whose mean
/// intensity (0..1) is compared against `threshold`. A feature votes with
/// `weight` when the comparison matches its `polarity`.
#[derive(Debug, Clone, Deserialize)]
pub struct Feature {
    /// x, y, width, height inside the unscaled window.
    pub rect: [u32; 4],
    /// +1 fires on mean > threshold, -1 on mean < threshold.
    pub polarity: i8,
    pub threshold: f32,
    pub weight: f32,
}

/// Classifier descriptor as stored on disk (JSON).
#[derive(Debug, Clone, Deserialize)]
pub struct Descriptor {
    pub window_width: u32,
    pub window_height: u32,
    /// Scan step in pixels at scale 1.0.
    pub stride: u32,
    /// Multiplier between pyramid levels, > 1.0.
    pub scale_step: f32,
    /// Minimum summed feature weight for a window to count as a detection.
    pub accept_threshold: f32,
    pub features: Vec<Feature>,
}

/// Sliding-window detector evaluated over an integral image.
///
/// The descriptor format is deliberately small: the interesting surface is
/// loading (fatal on bad resources) and the `detect` seam, not the numerics.
#[derive(Debug)]
pub struct Classifier {
    desc: Descriptor,
}

impl Classifier {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read classifier descriptor {}", path.display()))?;
        let desc: Descriptor = serde_json::from_str(&raw)
            .with_context(|| format!("parse classifier descriptor {}", path.display()))?;

        anyhow::ensure!(
            desc.window_width > 0 && desc.window_height > 0,
            "classifier window is empty"
        );
        anyhow::ensure!(!desc.features.is_empty(), "classifier has no features");
        anyhow::ensure!(desc.stride > 0, "classifier stride must be positive");
        anyhow::ensure!(desc.scale_step > 1.0, "classifier scale_step must exceed 1.0");
        for f in &desc.features {
            let [x, y, w, h] = f.rect;
            anyhow::ensure!(
                w > 0 && h > 0 && x + w <= desc.window_width && y + h <= desc.window_height,
                "classifier feature rect {:?} escapes the window",
                f.rect
            );
        }

        info!(
            "classifier: loaded {} ({} features, {}x{} window)",
            path.display(),
            desc.features.len(),
            desc.window_width,
            desc.window_height
        );
        Ok(Self { desc })
    }

    /// Scan the frame at every pyramid scale and return the windows whose
    /// weighted feature votes reach the acceptance threshold.
    pub fn detect(&self, gray: &GrayImage) -> Vec<PixelRect> {
        let (img_w, img_h) = gray.dimensions();
        if img_w < self.desc.window_width || img_h < self.desc.window_height {
            return Vec::new();
        }

        let integral = integral_image::<_, u64>(gray);
        let mut out = Vec::new();

        let mut scale = 1.0f32;
        loop {
            let win_w = (self.desc.window_width as f32 * scale) as u32;
            let win_h = (self.desc.window_height as f32 * scale) as u32;
            if win_w > img_w || win_h > img_h {
                break;
            }
            let stride = ((self.desc.stride as f32 * scale) as u32).max(1);

            let mut y = 0;
            while y + win_h <= img_h {
                let mut x = 0;
                while x + win_w <= img_w {
                    if self.window_score(&integral, x, y, scale) >= self.desc.accept_threshold {
                        out.push(PixelRect::new(x, y, win_w, win_h));
                    }
                    x += stride;
                }
                y += stride;
            }

            scale *= self.desc.scale_step;
        }
        out
    }

    fn window_score(
        &self,
        integral: &image::ImageBuffer<image::Luma<u64>, Vec<u64>>,
        win_x: u32,
        win_y: u32,
        scale: f32,
    ) -> f32 {
        let mut score = 0.0;
        for f in &self.desc.features {
            let [fx, fy, fw, fh] = f.rect;
            let x = win_x + (fx as f32 * scale) as u32;
            let y = win_y + (fy as f32 * scale) as u32;
            let w = ((fw as f32 * scale) as u32).max(1);
            let h = ((fh as f32 * scale) as u32).max(1);

            let sum = sum_image_pixels(integral, x, y, x + w - 1, y + h - 1)[0];
            let mean = sum as f32 / (w * h) as f32 / 255.0;

            let fires = if f.polarity >= 0 {
                mean > f.threshold
            } else {
                mean < f.threshold
            };
            if fires {
                score += f.weight;
            }
        }
        score
    }
}
