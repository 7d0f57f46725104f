use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use artrack_types::GrayImage;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Lists image files directly inside `dir`, sorted by filename so a
/// numbered frame sequence (`frame_0001.png`, ...) is processed in order.
pub fn list_image_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("reading directory {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();
    Ok(paths)
}

/// Decodes `path` and converts it to grayscale, matching the luma
/// conversion `Frame::to_grayscale` would apply to a single-channel buffer.
pub fn load_gray(path: &Path) -> Result<GrayImage> {
    let img = image::open(path).with_context(|| format!("decoding image {}", path.display()))?.to_luma8();
    let width = img.width();
    let height = img.height();
    Ok(GrayImage { data: img.into_raw(), width, height })
}
