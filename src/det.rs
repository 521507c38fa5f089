use std::time::Instant;

use tracing::debug;

use crate::dataset::Sample;
use crate::engine::{EngineError, ScoreMaps, TextModel};
use crate::geometry::{Polygon, Rectangle, ScaleFactor};
use crate::offset::offset_polygons;
use crate::postprocess::{extract_rectangles, Mask};
use crate::types::DetConfig;

/// Geometry of one image: raw rectangles and their offset polygons.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionResult {
    pub rects: Vec<Rectangle>,
    pub polygons: Vec<Polygon>,
}

impl DetectionResult {
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }
}

pub struct DetectionOutput {
    pub maps: ScoreMaps,
    pub result: DetectionResult,
    pub elapse: f64,
}

pub struct TextDetector<M> {
    pub cfg: DetConfig,
    pub model: M,
}

impl<M: TextModel> TextDetector<M> {
    pub fn new(cfg: DetConfig, model: M) -> Self {
        Self { cfg, model }
    }

    pub fn detect(&mut self, sample: &Sample) -> Result<DetectionOutput, EngineError> {
        let start = Instant::now();

        let maps = self.model.infer(&sample.input)?;
        let (_, _, in_h, in_w) = sample.input.dim();
        self.check_map_shape(maps.dim(), (in_h, in_w))?;

        let result = self.post_process(&maps, sample.scale)?;
        let elapse = start.elapsed().as_secs_f64();

        Ok(DetectionOutput { maps, result, elapse })
    }

    /// Threshold, extract, filter and offset. No model involved.
    pub fn post_process(&self, maps: &ScoreMaps, scale: ScaleFactor) -> Result<DetectionResult, EngineError> {
        let mask = Mask::from_scores(maps.binarization.view(), self.cfg.mask_thresh)?;
        let rects = extract_rectangles(&mask, scale, self.cfg.upscale)?;
        let rects = self
            .cfg
            .filter
            .apply(rects, maps.probability.view(), scale, self.cfg.upscale);

        let sources: Vec<Polygon> = rects.iter().map(Rectangle::to_polygon).collect();
        let polygons = offset_polygons(&sources, &self.cfg.offset)?;
        debug!(
            "{} foreground pixels -> {} rectangles -> {} offset polygons",
            mask.foreground_count(),
            rects.len(),
            polygons.len()
        );

        Ok(DetectionResult { rects, polygons })
    }

    fn check_map_shape(&self, map: (usize, usize), input: (usize, usize)) -> Result<(), EngineError> {
        let up = self.cfg.upscale;
        let off = |m: usize, i: usize| (m as f32 * up - i as f32).abs() > up;
        if map.0 == 0 || map.1 == 0 || off(map.0, input.0) || off(map.1, input.1) {
            return Err(EngineError::InvalidOutputShape(format!(
                "score map {:?} does not match input {:?} at 1/{} resolution",
                map, input, up
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::RgbImage;
    use ndarray::{Array2, Array4};
    use std::path::PathBuf;

    /// Returns fixed maps regardless of input.
    pub(crate) struct FixedModel {
        pub maps: ScoreMaps,
    }

    impl TextModel for FixedModel {
        fn infer(&mut self, _input: &Array4<f32>) -> Result<ScoreMaps, EngineError> {
            Ok(self.maps.clone())
        }
    }

    pub(crate) fn maps_with_block(h: usize, w: usize, x0: usize, y0: usize, x1: usize, y1: usize) -> ScoreMaps {
        let mut bin = Array2::<f32>::zeros((h, w));
        for y in y0..y1 {
            for x in x0..x1 {
                bin[[y, x]] = 0.97;
            }
        }
        ScoreMaps::new(bin.clone(), Array2::zeros((h, w)), bin).unwrap()
    }

    fn sample(h: usize, w: usize, scale: ScaleFactor) -> Sample {
        Sample {
            path: PathBuf::from("img_1.jpg"),
            original: RgbImage::new(w as u32, h as u32),
            input: Array4::zeros((1, 3, h, w)),
            scale,
        }
    }

    #[test]
    fn test_post_process_block() {
        let maps = maps_with_block(40, 60, 10, 10, 40, 30);
        let det = TextDetector::new(DetConfig::default(), FixedModel { maps: maps.clone() });
        let result = det.post_process(&maps, ScaleFactor::identity()).unwrap();

        assert_eq!(result.rects.len(), 1);
        // pixels 10..=39 x 10..=29, times 4
        assert_eq!(result.rects[0].flatten(), [40, 116, 40, 40, 156, 40, 156, 116]);
        assert_eq!(result.polygons.len(), 1);
        assert!(result.polygons[0].area() < result.rects[0].area());
    }

    #[test]
    fn test_empty_maps_give_empty_result() {
        let maps = maps_with_block(40, 60, 0, 0, 0, 0);
        let det = TextDetector::new(DetConfig::default(), FixedModel { maps: maps.clone() });
        let result = det.post_process(&maps, ScaleFactor::identity()).unwrap();
        assert!(result.is_empty());
        assert!(result.polygons.is_empty());
    }

    #[test]
    fn test_detect_rejects_mismatched_map_shape() {
        let maps = maps_with_block(40, 60, 10, 10, 40, 20);
        let mut det = TextDetector::new(DetConfig::default(), FixedModel { maps });

        assert!(det.detect(&sample(160, 240, ScaleFactor::identity())).is_ok());
        assert!(matches!(
            det.detect(&sample(320, 240, ScaleFactor::identity())),
            Err(EngineError::InvalidOutputShape(_))
        ));
    }
}
