use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;

use crate::engine::EngineError;
use crate::geometry::ScaleFactor;

pub struct DetPreProcess {
    pub long_size: u32,
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl DetPreProcess {
    pub fn new(long_size: u32, mean: [f32; 3], std: [f32; 3]) -> Self {
        Self { long_size, mean, std }
    }

    /// Resize so the long side is `long_size` (both sides aligned to 32) and
    /// normalize into a `[1, 3, H, W]` tensor. Also returns the per-axis
    /// resize factor.
    pub fn run(&self, img: &RgbImage) -> Result<(Array4<f32>, ScaleFactor), EngineError> {
        let (w, h) = img.dimensions();
        let (resize_w, resize_h) = self.target_size(w, h)?;

        let resized = imageops::resize(img, resize_w, resize_h, FilterType::Triangle);
        let scale = ScaleFactor::new(resize_w as f32 / w as f32, resize_h as f32 / h as f32)?;

        Ok((self.normalize_and_permute(&resized), scale))
    }

    pub fn target_size(&self, w: u32, h: u32) -> Result<(u32, u32), EngineError> {
        if w == 0 || h == 0 {
            return Err(EngineError::Preprocess(format!("empty image {}x{}", w, h)));
        }
        if self.long_size == 0 {
            return Err(EngineError::Preprocess("long_size must be positive".to_string()));
        }

        let ratio = self.long_size as f32 / w.max(h) as f32;
        let align = |side: u32| {
            let scaled = (side as f32 * ratio).round();
            (((scaled / 32.0).round() * 32.0) as u32).max(32)
        };

        Ok((align(w), align(h)))
    }

    fn normalize_and_permute(&self, img: &RgbImage) -> Array4<f32> {
        let (w, h) = img.dimensions();
        let mut out = Array4::<f32>::zeros((1, 3, h as usize, w as usize));
        let scale = 1.0 / 255.0;

        for (x, y, pix) in img.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for c in 0..3 {
                out[[0, c, y, x]] = (pix[c] as f32 * scale - self.mean[c]) / self.std[c];
            }
        }

        out
    }
}
