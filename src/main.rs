use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use textshrink::{DetPreProcess, EvalConfig, Evaluator, ImageDataset, OffsetDirection, OrtModel};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "textshrink")]
#[command(about = "Evaluate a scene-text detection model and write offset text regions", long_about = None)]
struct Cli {
    /// Path to detection model (ONNX)
    #[arg(long)]
    model: PathBuf,

    /// Directory of test images
    #[arg(long, default_value = "data/ic15/test_images")]
    root_dir: PathBuf,

    /// JSON config file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    vis_dir: Option<PathBuf>,

    #[arg(long)]
    submit_dir: Option<PathBuf>,

    /// Target length of the longer image side
    #[arg(long)]
    long_size: Option<u32>,

    /// Binarization cutoff
    #[arg(long)]
    mask_thresh: Option<f32>,

    #[arg(long)]
    shrink_rate: Option<f64>,

    #[arg(long)]
    max_offset: Option<i64>,

    /// Grow polygons instead of shrinking them
    #[arg(long)]
    outward: bool,

    /// Drop rectangles smaller than this many pixels
    #[arg(long)]
    min_area: Option<f32>,

    /// Drop rectangles whose mean probability is below this
    #[arg(long)]
    min_score: Option<f32>,

    /// Skip the probability, threshold and binarization map images
    #[arg(long)]
    no_maps: bool,

    #[arg(long)]
    threads: Option<usize>,
}

impl Cli {
    fn into_config(self) -> Result<(EvalConfig, PathBuf, PathBuf), Box<dyn std::error::Error>> {
        let mut cfg = match &self.config {
            Some(path) => EvalConfig::from_json_file(path)?,
            None => EvalConfig::default(),
        };

        if let Some(dir) = self.vis_dir {
            cfg.vis_dir = dir;
        }
        if let Some(dir) = self.submit_dir {
            cfg.submit_dir = dir;
        }
        if let Some(v) = self.long_size {
            cfg.det.long_size = v;
        }
        if let Some(v) = self.mask_thresh {
            cfg.det.mask_thresh = v;
        }
        if let Some(v) = self.shrink_rate {
            cfg.det.offset.shrink_rate = v;
        }
        if let Some(v) = self.max_offset {
            cfg.det.offset.max_offset = v;
        }
        if self.outward {
            cfg.det.offset.direction = OffsetDirection::Outward;
        }
        if self.min_area.is_some() {
            cfg.det.filter.min_area = self.min_area;
        }
        if self.min_score.is_some() {
            cfg.det.filter.min_score = self.min_score;
        }
        if self.no_maps {
            cfg.write_maps = false;
        }
        if let Some(n) = self.threads {
            cfg.engine.intra_op_num_threads = n;
        }

        Ok((cfg, self.model, self.root_dir))
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let (cfg, model_path, root_dir) = Cli::parse().into_config()?;
    cfg.det.offset.validate()?;
    info!("config: {}", serde_json::to_string(&cfg)?);

    let model = OrtModel::from_path(&model_path, &cfg.engine)?;
    let pre = DetPreProcess::new(cfg.det.long_size, cfg.det.mean, cfg.det.std);
    let dataset = ImageDataset::open(&root_dir, pre)?;

    let mut evaluator = Evaluator::new(cfg, model);
    let cancel = evaluator.cancel_flag();
    ctrlc::set_handler(move || {
        cancel.store(true, Ordering::SeqCst);
    })?;

    let summary = evaluator.run(&dataset)?;
    if summary.cancelled {
        warn!("interrupted, outputs are partial");
    }
    info!(
        "done: {} images, {} rectangles, {:.2} fps",
        summary.images,
        summary.rectangles,
        summary.fps()
    );

    Ok(())
}
