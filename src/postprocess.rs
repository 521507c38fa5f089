//! Mask-to-polygon extraction.
//!
//! The binarization map is thresholded into a [`Mask`], every connected
//! foreground region gets a minimum-area rotated rectangle, and the corners are
//! mapped from mask resolution back to original-image pixels.

use ndarray::{Array2, ArrayView2};
use tracing::debug;

use crate::contours::find_contours;
use crate::geometry::{GeometryError, Point, Rectangle, ScaleFactor};
use crate::image_impl::{box_points, min_area_rect, Point2f};

/// Binary text mask, values in `{0, 1}`, stored row-major as `(height, width)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    data: Array2<u8>,
}

impl Mask {
    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Result<Self, GeometryError> {
        let expected = width * height;
        if data.len() != expected {
            return Err(GeometryError::MaskShape {
                expected,
                actual: data.len(),
            });
        }
        if let Some(&value) = data.iter().find(|&&v| v > 1) {
            return Err(GeometryError::MaskValue { value });
        }
        let data = Array2::from_shape_vec((height, width), data).map_err(|_| GeometryError::MaskShape {
            expected,
            actual: expected,
        })?;
        Ok(Self { data })
    }

    /// `1` where `score > threshold`.
    pub fn from_scores(scores: ArrayView2<'_, f32>, threshold: f32) -> Result<Self, GeometryError> {
        if scores.iter().any(|v| !v.is_finite()) {
            return Err(GeometryError::NonFiniteScore);
        }
        let data = scores.mapv(|v| u8::from(v > threshold));
        Ok(Self { data })
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn is_set(&self, x: usize, y: usize) -> bool {
        self.data[[y, x]] != 0
    }

    pub fn foreground_count(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }
}

/// One rectangle per connected region of `mask`, in original-image pixels.
///
/// Corners are multiplied by `upscale` (mask resolution to model input), then
/// divided by the per-axis resize factor and truncated toward zero.
pub fn extract_rectangles(
    mask: &Mask,
    scale: ScaleFactor,
    upscale: f32,
) -> Result<Vec<Rectangle>, GeometryError> {
    ScaleFactor::new(scale.sx, scale.sy)?;
    if !upscale.is_finite() || upscale <= 0.0 {
        return Err(GeometryError::InvalidScale {
            sx: upscale,
            sy: upscale,
        });
    }

    let contours = find_contours(mask);
    debug!("found {} regions in {}x{} mask", contours.len(), mask.width(), mask.height());

    let mut rects = Vec::with_capacity(contours.len());
    for contour in &contours {
        let points: Vec<Point2f> = contour
            .points
            .iter()
            .map(|&(x, y)| Point2f::new(x as f32, y as f32))
            .collect();

        let rect = min_area_rect(&points)?;
        let corners = box_points(&rect);

        let mut out = [Point::default(); 4];
        for (dst, c) in out.iter_mut().zip(corners.iter()) {
            let x = c.x as f64 * upscale as f64 / scale.sx as f64;
            let y = c.y as f64 * upscale as f64 / scale.sy as f64;
            if !x.is_finite() || !y.is_finite() {
                return Err(GeometryError::NonFiniteCoordinate);
            }
            *dst = Point::new(x as i32, y as i32);
        }
        rects.push(Rectangle::new(out));
    }

    Ok(rects)
}

/// Optional candidate pruning applied between extraction and offsetting.
///
/// Both thresholds are unset by default, in which case every rectangle passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CandidateFilter {
    /// Minimum rectangle area in original-image pixels.
    pub min_area: Option<f32>,
    /// Minimum mean probability inside the rectangle.
    pub min_score: Option<f32>,
}

impl CandidateFilter {
    pub fn is_enabled(&self) -> bool {
        self.min_area.is_some() || self.min_score.is_some()
    }

    pub fn apply(
        &self,
        rects: Vec<Rectangle>,
        prob_map: ArrayView2<'_, f32>,
        scale: ScaleFactor,
        upscale: f32,
    ) -> Vec<Rectangle> {
        if !self.is_enabled() {
            return rects;
        }

        let before = rects.len();
        let kept: Vec<Rectangle> = rects
            .into_iter()
            .filter(|rect| {
                if let Some(min_area) = self.min_area {
                    if rect.area() < min_area as f64 {
                        return false;
                    }
                }
                if let Some(min_score) = self.min_score {
                    let map_pts = rect.points.map(|p| {
                        Point2f::new(
                            p.x as f32 * scale.sx / upscale,
                            p.y as f32 * scale.sy / upscale,
                        )
                    });
                    if box_score(prob_map, &map_pts) < min_score {
                        return false;
                    }
                }
                true
            })
            .collect();

        debug!("candidate filter kept {} of {} rectangles", kept.len(), before);
        kept
    }
}

/// Mean of `map` over the pixels whose centers fall inside `box_pts`.
pub fn box_score(map: ArrayView2<'_, f32>, box_pts: &[Point2f; 4]) -> f32 {
    let (h, w) = map.dim();
    if h == 0 || w == 0 {
        return 0.0;
    }

    let xmin = box_pts.iter().map(|p| p.x).fold(f32::INFINITY, f32::min).floor() as i32;
    let xmax = box_pts.iter().map(|p| p.x).fold(f32::NEG_INFINITY, f32::max).ceil() as i32;
    let ymin = box_pts.iter().map(|p| p.y).fold(f32::INFINITY, f32::min).floor() as i32;
    let ymax = box_pts.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max).ceil() as i32;

    let xmin = xmin.clamp(0, w as i32 - 1);
    let xmax = xmax.clamp(0, w as i32 - 1);
    let ymin = ymin.clamp(0, h as i32 - 1);
    let ymax = ymax.clamp(0, h as i32 - 1);

    let mut sum = 0.0f32;
    let mut count = 0usize;
    for y in ymin..=ymax {
        for x in xmin..=xmax {
            if point_in_polygon(x as f32 + 0.5, y as f32 + 0.5, box_pts) {
                sum += map[[y as usize, x as usize]];
                count += 1;
            }
        }
    }

    if count == 0 {
        0.0
    } else {
        sum / count as f32
    }
}

fn point_in_polygon(x: f32, y: f32, polygon: &[Point2f; 4]) -> bool {
    let mut inside = false;
    let mut j = polygon.len() - 1;

    for i in 0..polygon.len() {
        let (xi, yi) = (polygon[i].x, polygon[i].y);
        let (xj, yj) = (polygon[j].x, polygon[j].y);

        let intersect = ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi);
        if intersect {
            inside = !inside;
        }
        j = i;
    }

    inside
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offset::offset_polygons;
    use crate::types::OffsetConfig;
    use ndarray::Array2;

    fn block_mask(width: usize, height: usize, x0: usize, y0: usize, x1: usize, y1: usize) -> Mask {
        let mut data = vec![0u8; width * height];
        for y in y0..y1 {
            for x in x0..x1 {
                data[y * width + x] = 1;
            }
        }
        Mask::from_raw(width, height, data).unwrap()
    }

    #[test]
    fn test_mask_from_scores_uses_strict_threshold() {
        let scores = Array2::from_shape_vec((1, 3), vec![0.5, 0.9, 0.95]).unwrap();
        let mask = Mask::from_scores(scores.view(), 0.9).unwrap();
        assert!(!mask.is_set(0, 0));
        assert!(!mask.is_set(1, 0));
        assert!(mask.is_set(2, 0));
        assert_eq!(mask.foreground_count(), 1);
    }

    #[test]
    fn test_malformed_masks_are_rejected() {
        assert_eq!(
            Mask::from_raw(4, 4, vec![0; 15]),
            Err(GeometryError::MaskShape { expected: 16, actual: 15 })
        );
        assert_eq!(
            Mask::from_raw(2, 1, vec![0, 255]),
            Err(GeometryError::MaskValue { value: 255 })
        );
        let scores = Array2::from_elem((2, 2), f32::NAN);
        assert_eq!(Mask::from_scores(scores.view(), 0.9), Err(GeometryError::NonFiniteScore));
    }

    #[test]
    fn test_empty_mask_yields_no_rectangles() {
        let mask = Mask::from_raw(16, 16, vec![0; 256]).unwrap();
        let rects = extract_rectangles(&mask, ScaleFactor::identity(), 4.0).unwrap();
        assert!(rects.is_empty());
    }

    #[test]
    fn test_rectangle_is_upscaled_and_rescaled() {
        // pixels x in 2..=11, y in 3..=7
        let mask = block_mask(20, 12, 2, 3, 12, 8);
        let scale = ScaleFactor::new(0.5, 2.0).unwrap();
        let rects = extract_rectangles(&mask, scale, 4.0).unwrap();
        assert_eq!(rects.len(), 1);
        // corners (2,7) (2,3) (11,3) (11,7) in mask space
        assert_eq!(
            rects[0].flatten(),
            [16, 14, 16, 6, 88, 6, 88, 14]
        );
    }

    #[test]
    fn test_scale_round_trip_within_one_pixel() {
        let mask = block_mask(64, 48, 5, 7, 40, 19);
        let scale = ScaleFactor::new(0.37, 0.61).unwrap();
        let rects = extract_rectangles(&mask, scale, 4.0).unwrap();
        let identity = extract_rectangles(&mask, ScaleFactor::identity(), 1.0).unwrap();

        for (scaled, raw) in rects[0].points.iter().zip(identity[0].points.iter()) {
            let back_x = scaled.x as f32 / 4.0 * scale.sx;
            let back_y = scaled.y as f32 / 4.0 * scale.sy;
            assert!((back_x - raw.x as f32).abs() <= 1.0, "{} vs {}", back_x, raw.x);
            assert!((back_y - raw.y as f32).abs() <= 1.0, "{} vs {}", back_y, raw.y);
        }
    }

    #[test]
    fn test_single_pixel_region_passes_through_as_degenerate() {
        let mask = block_mask(8, 8, 3, 3, 4, 4);
        let rects = extract_rectangles(&mask, ScaleFactor::identity(), 4.0).unwrap();
        assert_eq!(rects.len(), 1);
        assert_eq!(rects[0].area(), 0.0);
        assert_eq!(rects[0].points, [Point::new(12, 12); 4]);
    }

    fn diagonal_band(half_width: i32) -> Mask {
        let size = 100;
        let mut data = vec![0u8; size * size];
        for x in 15..65i32 {
            for y in (x - half_width)..=(x + half_width) {
                data[y as usize * size + x as usize] = 1;
            }
        }
        Mask::from_raw(size, size, data).unwrap()
    }

    fn assert_rotated(rect: &Rectangle) {
        for i in 0..4 {
            let (a, b) = (rect.points[i], rect.points[(i + 1) % 4]);
            assert_ne!(a.x, b.x, "axis-aligned edge in {:?}", rect.points);
            assert_ne!(a.y, b.y, "axis-aligned edge in {:?}", rect.points);
        }
    }

    #[test]
    fn test_diagonal_band_gives_rotated_rectangle_that_shrinks() {
        let rects = extract_rectangles(&diagonal_band(10), ScaleFactor::identity(), 4.0).unwrap();
        assert_eq!(rects.len(), 1);
        let rect = &rects[0];
        assert_rotated(rect);
        for p in &rect.points {
            assert!((0..=400).contains(&p.x) && (0..=400).contains(&p.y), "{:?}", p);
        }
        // 45 degree band: about 57 px wide and 334 px long
        assert!((rect.area() - 18_880.0).abs() < 1_500.0, "area {}", rect.area());

        let src = rect.to_polygon();
        let out = offset_polygons(&[src.clone()], &OffsetConfig::default()).unwrap();
        assert_eq!(out.len(), 1);
        assert_ne!(out[0], src);
        assert!(out[0].len() >= 3);
        assert!(out[0].area() > 0.0 && out[0].area() < src.area());
    }

    #[test]
    fn test_thin_diagonal_band_keeps_its_rectangle() {
        let rects = extract_rectangles(&diagonal_band(1), ScaleFactor::identity(), 4.0).unwrap();
        assert_eq!(rects.len(), 1);
        assert_rotated(&rects[0]);

        // about 6 px wide, so the 4 px shrink collapses it
        let src = rects[0].to_polygon();
        assert!(src.area() >= 200.0);
        let out = offset_polygons(&[src.clone()], &OffsetConfig::default()).unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].len() >= 3);
        assert!(out[0].area() <= src.area());
    }

    #[test]
    fn test_invalid_scale_is_rejected() {
        let mask = block_mask(8, 8, 1, 1, 4, 4);
        let scale = ScaleFactor { sx: 0.0, sy: 1.0 };
        assert!(matches!(
            extract_rectangles(&mask, scale, 4.0),
            Err(GeometryError::InvalidScale { .. })
        ));
    }

    #[test]
    fn test_candidate_filter_defaults_keep_everything() {
        let rects = vec![Rectangle::default(); 3];
        let map = Array2::<f32>::zeros((4, 4));
        let kept = CandidateFilter::default().apply(rects, map.view(), ScaleFactor::identity(), 4.0);
        assert_eq!(kept.len(), 3);
    }

    #[test]
    fn test_candidate_filter_by_area_and_score() {
        let mut map = Array2::<f32>::zeros((10, 10));
        for y in 0..5 {
            for x in 0..5 {
                map[[y, x]] = 1.0;
            }
        }
        let hot = Rectangle::new([
            Point::new(0, 20),
            Point::new(0, 0),
            Point::new(20, 0),
            Point::new(20, 20),
        ]);
        let cold = Rectangle::new([
            Point::new(24, 40),
            Point::new(24, 24),
            Point::new(40, 24),
            Point::new(40, 40),
        ]);
        let tiny = Rectangle::new([
            Point::new(0, 4),
            Point::new(0, 0),
            Point::new(4, 0),
            Point::new(4, 4),
        ]);

        let by_score = CandidateFilter { min_area: None, min_score: Some(0.93) };
        let kept = by_score.apply(vec![hot, cold], map.view(), ScaleFactor::identity(), 4.0);
        assert_eq!(kept, vec![hot]);

        let by_area = CandidateFilter { min_area: Some(100.0), min_score: None };
        let kept = by_area.apply(vec![hot, tiny], map.view(), ScaleFactor::identity(), 4.0);
        assert_eq!(kept, vec![hot]);
    }
}
