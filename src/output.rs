//! Per-image artifacts: submission text, debug score maps and the annotated
//! visualization.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use ndarray::Array2;
use tracing::debug;

use crate::engine::{EngineError, ScoreMaps};
use crate::geometry::{Point, Polygon, Rectangle};

const OFFSET_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
const RECT_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
// offsets giving a 2 px stroke for any line direction
const PEN: [(f32, f32); 3] = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)];

/// One `x1, y1, x2, y2, x3, y3, x4, y4` line per rectangle.
pub fn format_result(rects: &[Rectangle]) -> String {
    let mut out = String::with_capacity(rects.len() * 48);
    for rect in rects {
        let _ = writeln!(out, "{}", rect);
    }
    out
}

/// Writes `<dir>/res_<stem>.txt`, creating `dir` if needed.
pub fn write_result(dir: &Path, stem: &str, rects: &[Rectangle]) -> Result<PathBuf, EngineError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("res_{}.txt", stem));
    std::fs::write(&path, format_result(rects))?;
    debug!("wrote {} rectangles to {}", rects.len(), path.display());
    Ok(path)
}

/// Map values scaled by 255 and truncated to 8 bits.
pub fn map_to_gray(map: &Array2<f32>) -> GrayImage {
    let (h, w) = map.dim();
    GrayImage::from_fn(w as u32, h as u32, |x, y| {
        Luma([(map[[y as usize, x as usize]] * 255.0) as u8])
    })
}

/// Writes `<stem>_prob.png`, `<stem>_thre.png` and `<stem>_bin.png` into `dir`.
pub fn write_score_maps(dir: &Path, stem: &str, maps: &ScoreMaps) -> Result<(), EngineError> {
    std::fs::create_dir_all(dir)?;
    for (suffix, map) in [
        ("prob", &maps.probability),
        ("thre", &maps.threshold),
        ("bin", &maps.binarization),
    ] {
        map_to_gray(map).save(dir.join(format!("{}_{}.png", stem, suffix)))?;
    }
    Ok(())
}

/// Offset polygons first, raw rectangles on top.
pub fn draw_detections(image: &mut RgbImage, rects: &[Rectangle], polygons: &[Polygon]) {
    for poly in polygons {
        draw_closed_polyline(image, &poly.points, OFFSET_COLOR);
    }
    for rect in rects {
        draw_closed_polyline(image, &rect.points, RECT_COLOR);
    }
}

fn draw_closed_polyline(image: &mut RgbImage, points: &[Point], color: Rgb<u8>) {
    let n = points.len();
    if n < 2 {
        return;
    }
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        for (dx, dy) in PEN {
            draw_line_segment_mut(
                image,
                (a.x as f32 + dx, a.y as f32 + dy),
                (b.x as f32 + dx, b.y as f32 + dy),
                color,
            );
        }
    }
}

/// Draws onto a copy of `original` and saves it as `<dir>/<file_name>`.
pub fn write_visualization(
    dir: &Path,
    file_name: &str,
    original: &RgbImage,
    rects: &[Rectangle],
    polygons: &[Polygon],
) -> Result<PathBuf, EngineError> {
    std::fs::create_dir_all(dir)?;
    let mut canvas = original.clone();
    draw_detections(&mut canvas, rects, polygons);
    let path = dir.join(file_name);
    canvas.save(&path)?;
    Ok(path)
}
