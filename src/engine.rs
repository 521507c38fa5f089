use std::path::Path;

use ndarray::{s, Array2, Array4, ArrayView4};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use tracing::{debug, info};

use crate::geometry::GeometryError;
use crate::types::EngineConfig;

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("ORT error: {0}")]
    Ort(String),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid model output: {0}")]
    InvalidOutputShape(String),

    #[error("Preprocess error: {0}")]
    Preprocess(String),

    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Config error: {0}")]
    Config(String),
}

fn ort_err(err: impl std::fmt::Display) -> EngineError {
    EngineError::Ort(err.to_string())
}

/// The three same-sized maps a differentiable-binarization head produces.
#[derive(Debug, Clone)]
pub struct ScoreMaps {
    pub probability: Array2<f32>,
    pub threshold: Array2<f32>,
    pub binarization: Array2<f32>,
}

impl ScoreMaps {
    pub fn new(
        probability: Array2<f32>,
        threshold: Array2<f32>,
        binarization: Array2<f32>,
    ) -> Result<Self, EngineError> {
        let dim = probability.dim();
        if threshold.dim() != dim || binarization.dim() != dim {
            return Err(EngineError::InvalidOutputShape(format!(
                "maps differ in shape: {:?} / {:?} / {:?}",
                dim,
                threshold.dim(),
                binarization.dim()
            )));
        }
        Ok(Self {
            probability,
            threshold,
            binarization,
        })
    }

    /// Split a `[1, 3, H, W]` tensor whose channels are probability,
    /// threshold and binarization.
    pub fn from_nchw(tensor: ArrayView4<'_, f32>) -> Result<Self, EngineError> {
        let (n, c, _, _) = tensor.dim();
        if n < 1 || c < 3 {
            return Err(EngineError::InvalidOutputShape(format!(
                "expected [1, 3, H, W], got {:?}",
                tensor.dim()
            )));
        }
        Self::new(
            tensor.slice(s![0, 0, .., ..]).to_owned(),
            tensor.slice(s![0, 1, .., ..]).to_owned(),
            tensor.slice(s![0, 2, .., ..]).to_owned(),
        )
    }

    /// `(height, width)`
    pub fn dim(&self) -> (usize, usize) {
        self.probability.dim()
    }
}

/// Text-detection network: normalized NCHW image in, score maps out.
pub trait TextModel {
    fn infer(&mut self, input: &Array4<f32>) -> Result<ScoreMaps, EngineError>;
}

pub struct OrtModel {
    session: Session,
}

impl OrtModel {
    pub fn from_path<P: AsRef<Path>>(model_path: P, engine_cfg: &EngineConfig) -> Result<Self, EngineError> {
        info!("loading model {}", model_path.as_ref().display());

        let mut builder = Session::builder()
            .map_err(ort_err)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(ort_err)?;

        if engine_cfg.intra_op_num_threads > 0 {
            builder = builder
                .with_intra_threads(engine_cfg.intra_op_num_threads)
                .map_err(ort_err)?;
        }

        if engine_cfg.inter_op_num_threads > 0 {
            builder = builder
                .with_inter_threads(engine_cfg.inter_op_num_threads)
                .map_err(ort_err)?;
        }

        let session = builder.commit_from_file(model_path).map_err(ort_err)?;
        Ok(Self { session })
    }
}

impl TextModel for OrtModel {
    fn infer(&mut self, input: &Array4<f32>) -> Result<ScoreMaps, EngineError> {
        let shape: Vec<i64> = input.shape().iter().map(|&d| d as i64).collect();
        let data: Vec<f32> = input.iter().copied().collect();
        let tensor = Tensor::from_array((shape, data)).map_err(ort_err)?;

        let outputs = self.session.run(ort::inputs![tensor]).map_err(ort_err)?;
        debug!("model returned {} outputs", outputs.len());

        let mut maps = Vec::with_capacity(outputs.len());
        for i in 0..outputs.len() {
            let (shape, data) = outputs[i].try_extract_tensor::<f32>().map_err(ort_err)?;
            let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
            maps.push((dims, data.to_vec()));
        }

        maps_from_outputs(maps)
    }
}

/// Accepts either one `[1, 3, H, W]` output or three outputs whose trailing
/// two dimensions are `H, W`.
fn maps_from_outputs(mut outputs: Vec<(Vec<usize>, Vec<f32>)>) -> Result<ScoreMaps, EngineError> {
    if outputs.len() == 1 {
        let (dims, data) = outputs.remove(0);
        if dims.len() != 4 {
            return Err(EngineError::InvalidOutputShape(format!("single output with shape {:?}", dims)));
        }
        let tensor = Array4::from_shape_vec((dims[0], dims[1], dims[2], dims[3]), data)
            .map_err(|e| EngineError::InvalidOutputShape(e.to_string()))?;
        return ScoreMaps::from_nchw(tensor.view());
    }

    if outputs.len() < 3 {
        return Err(EngineError::InvalidOutputShape(format!(
            "expected 1 or 3 outputs, got {}",
            outputs.len()
        )));
    }

    let mut planes = Vec::with_capacity(3);
    for (dims, data) in outputs.into_iter().take(3) {
        if dims.len() < 2 {
            return Err(EngineError::InvalidOutputShape(format!("output with shape {:?}", dims)));
        }
        let (h, w) = (dims[dims.len() - 2], dims[dims.len() - 1]);
        let plane_len = h * w;
        if data.len() < plane_len {
            return Err(EngineError::InvalidOutputShape(format!(
                "output has {} values, expected at least {}",
                data.len(),
                plane_len
            )));
        }
        let plane = Array2::from_shape_vec((h, w), data[..plane_len].to_vec())
            .map_err(|e| EngineError::InvalidOutputShape(e.to_string()))?;
        planes.push(plane);
    }

    let mut planes = planes.into_iter();
    match (planes.next(), planes.next(), planes.next()) {
        (Some(probability), Some(threshold), Some(binarization)) => {
            ScoreMaps::new(probability, threshold, binarization)
        }
        _ => Err(EngineError::InvalidOutputShape("missing output plane".to_string())),
    }
}
