use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use crate::dataset::{ImageDataset, Sample};
use crate::det::{DetectionResult, TextDetector};
use crate::engine::{EngineError, TextModel};
use crate::output::{write_result, write_score_maps, write_visualization};
use crate::types::EvalConfig;

#[derive(Debug, Clone, Default)]
pub struct EvalSummary {
    pub images: usize,
    pub rectangles: usize,
    pub polygons: usize,
    /// Seconds spent in inference and post-processing.
    pub total_time: f64,
    pub cancelled: bool,
}

impl EvalSummary {
    pub fn fps(&self) -> f64 {
        if self.total_time > 0.0 {
            self.images as f64 / self.total_time
        } else {
            0.0
        }
    }
}

/// Runs the detector over a dataset and writes every per-image artifact.
pub struct Evaluator<M> {
    pub detector: TextDetector<M>,
    pub cfg: EvalConfig,
    cancel: Arc<AtomicBool>,
}

impl<M: TextModel> Evaluator<M> {
    pub fn new(cfg: EvalConfig, model: M) -> Self {
        let detector = TextDetector::new(cfg.det.clone(), model);
        Self {
            detector,
            cfg,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Setting the flag stops the run before the next image.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn run(&mut self, dataset: &ImageDataset) -> Result<EvalSummary, EngineError> {
        let mut summary = EvalSummary::default();
        let total = dataset.len();

        for idx in 0..total {
            if self.cancel.load(Ordering::SeqCst) {
                warn!("cancelled after {} / {} images", idx, total);
                summary.cancelled = true;
                break;
            }
            info!("progress: {} / {}", idx, total);

            let sample = dataset.get(idx)?;
            let (result, elapse) = self.process_sample(&sample)?;

            summary.images += 1;
            summary.rectangles += result.rects.len();
            summary.polygons += result.polygons.len();
            summary.total_time += elapse;
            info!("fps: {:.2}", summary.fps());
        }

        info!(
            "evaluated {} images: {} rectangles, {} offset polygons",
            summary.images, summary.rectangles, summary.polygons
        );
        Ok(summary)
    }

    /// Detect one sample and write its visualization, maps and result file.
    pub fn process_sample(&mut self, sample: &Sample) -> Result<(DetectionResult, f64), EngineError> {
        let output = self.detector.detect(sample)?;
        let stem = sample.stem();
        info!(
            "{}: map {:?}, input {:?}, original {:?}, scale ({:.4}, {:.4})",
            stem,
            output.maps.dim(),
            sample.input.dim(),
            sample.original.dimensions(),
            sample.scale.sx,
            sample.scale.sy
        );

        if self.cfg.write_maps {
            write_score_maps(&self.cfg.vis_dir, &stem, &output.maps)?;
        }

        let result = output.result;
        write_result(&self.cfg.submit_dir, &stem, &result.rects)?;

        let file_name = file_name_of(&sample.path);
        write_visualization(
            &self.cfg.vis_dir,
            &file_name,
            &sample.original,
            &result.rects,
            &result.polygons,
        )?;

        Ok((result, output.elapse))
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unnamed.png".to_string())
}
