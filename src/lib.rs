//! # textshrink
//!
//! Post-processing and evaluation for segmentation-based scene-text detection.
//!
//! A detection model produces three score maps (probability, threshold and
//! binarization) at a quarter of the input resolution. This crate turns the
//! binarization map into rotated rectangles in original-image coordinates,
//! offsets each rectangle with a perimeter-proportional round-join offset, and
//! writes the submission files and visualizations used for benchmark evaluation.
//!
//! - **Pure Rust**: contour finding and rotated rectangles have no OpenCV
//!   dependency (an optional OpenCV backend is available via `use-opencv`)
//! - **ONNX Runtime** inference through `ort`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use textshrink::{EvalConfig, Evaluator, DetPreProcess, ImageDataset, OrtModel};
//!
//! let cfg = EvalConfig::default();
//! let model = OrtModel::from_path("models/det.onnx", &cfg.engine)?;
//! let pre = DetPreProcess::new(cfg.det.long_size, cfg.det.mean, cfg.det.std);
//! let dataset = ImageDataset::open("data/ic15/test_images", pre)?;
//!
//! let mut evaluator = Evaluator::new(cfg, model);
//! let summary = evaluator.run(&dataset)?;
//! println!("{} images at {:.2} fps", summary.images, summary.fps());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! The geometry stages work without a model:
//!
//! ```rust
//! use textshrink::{extract_rectangles, offset_polygons, Mask, OffsetConfig, Polygon, ScaleFactor};
//!
//! let mut data = vec![0u8; 20 * 10];
//! for y in 2..8 {
//!     for x in 2..18 {
//!         data[y * 20 + x] = 1;
//!     }
//! }
//! let mask = Mask::from_raw(20, 10, data)?;
//! let rects = extract_rectangles(&mask, ScaleFactor::identity(), 4.0)?;
//! let polys: Vec<Polygon> = rects.iter().map(|r| r.to_polygon()).collect();
//! let shrunk = offset_polygons(&polys, &OffsetConfig::default())?;
//! assert_eq!(shrunk.len(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod contours;
pub mod dataset;
pub mod det;
pub mod engine;
pub mod eval;
pub mod geometry;
pub mod image_impl;
pub mod offset;
pub mod output;
pub mod postprocess;
pub mod preprocess;
pub mod types;

pub use crate::dataset::{ImageDataset, Sample};
pub use crate::det::{DetectionOutput, DetectionResult, TextDetector};
pub use crate::engine::{EngineError, OrtModel, ScoreMaps, TextModel};
pub use crate::eval::{EvalSummary, Evaluator};
pub use crate::geometry::{GeometryError, Point, Polygon, Rectangle, ScaleFactor};
pub use crate::offset::{offset_distance, offset_polygon, offset_polygons};
pub use crate::postprocess::{extract_rectangles, CandidateFilter, Mask};
pub use crate::preprocess::DetPreProcess;
pub use crate::types::{DetConfig, EngineConfig, EvalConfig, OffsetConfig, OffsetDirection};
