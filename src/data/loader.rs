//! Directory scanning and image decoding.

use std::path::{Path, PathBuf};

use image::{GrayImage, RgbImage};

use crate::constants::SUPPORTED_EXTENSIONS;
use crate::error::{AnnotatorError, Result};

/// Check whether a path has one of the supported image extensions
/// (case-insensitive).
pub fn is_supported_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            SUPPORTED_EXTENSIONS.iter().any(|e| *e == ext)
        })
        .unwrap_or(false)
}

/// List all regular files directly inside `dir`, sorted by path.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| AnnotatorError::io_failure(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| AnnotatorError::io_failure(dir, e))?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Find every supported image directly inside `dir`, sorted by path.
///
/// An empty result is reported as `NoImagesFound`.
pub fn scan_directory(dir: &Path) -> Result<Vec<PathBuf>> {
    let images: Vec<PathBuf> = list_files(dir)?
        .into_iter()
        .filter(|path| is_supported_file(path))
        .collect();

    if images.is_empty() {
        return Err(AnnotatorError::NoImagesFound {
            dir: dir.to_path_buf(),
        });
    }

    log::info!("📂 Found {} images in {:?}", images.len(), dir);
    Ok(images)
}

/// Decode an image as RGB, rejecting undecodable and zero-area files.
pub fn load_image(path: &Path) -> Result<RgbImage> {
    let img = image::open(path)
        .map_err(|e| AnnotatorError::invalid_image(path, format!("failed to decode: {}", e)))?
        .to_rgb8();

    if img.width() == 0 || img.height() == 0 {
        return Err(AnnotatorError::invalid_image(path, "image has zero area"));
    }

    log::trace!("Loaded {:?} ({}x{})", path, img.width(), img.height());
    Ok(img)
}

/// Decode an image as single-channel grayscale.
pub fn load_mask(path: &Path) -> Result<GrayImage> {
    let img = image::open(path)
        .map_err(|e| AnnotatorError::invalid_image(path, format!("failed to decode: {}", e)))?
        .to_luma8();

    if img.width() == 0 || img.height() == 0 {
        return Err(AnnotatorError::invalid_image(path, "image has zero area"));
    }
    Ok(img)
}
