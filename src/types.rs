use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::EngineError;
use crate::geometry::GeometryError;
use crate::postprocess::CandidateFilter;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OffsetDirection {
    /// Shrink toward the polygon interior.
    #[default]
    Inward,
    /// Grow away from it, for callers that feed shrunk text kernels.
    Outward,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OffsetConfig {
    pub shrink_rate: f64,
    pub max_offset: i64,
    /// Polygons with a smaller area are dropped before offsetting.
    pub min_area: f64,
    pub direction: OffsetDirection,
    /// Maximum distance between a round join and its true arc.
    pub arc_tolerance: f64,
}

impl Default for OffsetConfig {
    fn default() -> Self {
        Self {
            shrink_rate: 1.5,
            max_offset: 20,
            min_area: 200.0,
            direction: OffsetDirection::Inward,
            arc_tolerance: 0.25,
        }
    }
}

impl OffsetConfig {
    /// Rejects values that would flip the offset direction or poison the
    /// distance computation.
    pub fn validate(&self) -> Result<(), GeometryError> {
        let invalid = |name: &'static str, value: f64| -> Result<(), GeometryError> {
            Err(GeometryError::InvalidParameter { name, value })
        };

        if !self.shrink_rate.is_finite() || self.shrink_rate < 0.0 {
            return invalid("shrink_rate", self.shrink_rate);
        }
        if self.max_offset < 0 {
            return invalid("max_offset", self.max_offset as f64);
        }
        if !self.min_area.is_finite() {
            return invalid("min_area", self.min_area);
        }
        if !self.arc_tolerance.is_finite() || self.arc_tolerance <= 0.0 {
            return invalid("arc_tolerance", self.arc_tolerance);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetConfig {
    /// Cutoff applied to the binarization map.
    pub mask_thresh: f32,
    /// Ratio between model input resolution and score map resolution.
    pub upscale: f32,
    pub long_size: u32,
    pub mean: [f32; 3],
    pub std: [f32; 3],
    pub filter: CandidateFilter,
    pub offset: OffsetConfig,
}

impl Default for DetConfig {
    fn default() -> Self {
        Self {
            mask_thresh: 0.9,
            upscale: 4.0,
            long_size: 720,
            mean: [0.485, 0.456, 0.406],
            std: [0.229, 0.224, 0.225],
            filter: CandidateFilter::default(),
            offset: OffsetConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub intra_op_num_threads: usize,
    pub inter_op_num_threads: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let num_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);

        Self {
            intra_op_num_threads: num_threads,
            inter_op_num_threads: 1,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    pub vis_dir: PathBuf,
    pub submit_dir: PathBuf,
    /// Write the `_prob`, `_thre` and `_bin` intensity maps next to the visualization.
    pub write_maps: bool,
    pub det: DetConfig,
    pub engine: EngineConfig,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            vis_dir: PathBuf::from("outputs/vis_ic15"),
            submit_dir: PathBuf::from("outputs/submit_ic15"),
            write_maps: true,
            det: DetConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

impl EvalConfig {
    /// Load from a JSON file; missing fields keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&text).map_err(|e| EngineError::Config(e.to_string()))
    }
}
