use std::path::{Path, PathBuf};

use image::RgbImage;
use ndarray::Array4;
use tracing::{debug, info};

use crate::engine::EngineError;
use crate::geometry::ScaleFactor;
use crate::preprocess::DetPreProcess;

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// One evaluation image, loaded and prepared for the model.
pub struct Sample {
    pub path: PathBuf,
    pub original: RgbImage,
    pub input: Array4<f32>,
    pub scale: ScaleFactor,
}

impl Sample {
    /// File name without extension, used to name every output of this image.
    pub fn stem(&self) -> String {
        file_stem(&self.path)
    }
}

pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Images directly under a root directory, in file-name order.
pub struct ImageDataset {
    paths: Vec<PathBuf>,
    pre: DetPreProcess,
}

impl ImageDataset {
    pub fn open<P: AsRef<Path>>(root: P, pre: DetPreProcess) -> Result<Self, EngineError> {
        let root = root.as_ref();
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(root)? {
            let path = entry?.path();
            if path.is_file() && is_image(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        info!("found {} images in {}", paths.len(), root.display());
        Ok(Self { paths, pre })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn get(&self, index: usize) -> Result<Sample, EngineError> {
        let path = self
            .paths
            .get(index)
            .ok_or_else(|| EngineError::Preprocess(format!("no sample at index {}", index)))?
            .clone();

        let original = image::open(&path)?.to_rgb8();
        let (input, scale) = self.pre.run(&original)?;
        debug!(
            "loaded {} {}x{} -> {:?}, scale ({:.4}, {:.4})",
            path.display(),
            original.width(),
            original.height(),
            input.dim(),
            scale.sx,
            scale.sy
        );

        Ok(Sample {
            path,
            original,
            input,
            scale,
        })
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
