//! Model file cache shared by the detector engines

use crate::error::ValidatorError;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Per-user cache directory for downloaded models
pub fn cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("plate-ocr-validator")
}

/// Ensure `filename` exists in `dir`, downloading it from `url` if needed
pub fn ensure_downloaded(url: &str, dir: &Path, filename: &str) -> Result<PathBuf, ValidatorError> {
    std::fs::create_dir_all(dir).map_err(|e| {
        ValidatorError::DetectionUnavailable(format!("Failed to create cache directory: {}", e))
    })?;

    let path = dir.join(filename);

    if !path.exists() {
        tracing::info!("Downloading {} (this may take a moment)...", filename);
        download_file(url, &path)?;
        tracing::info!("Downloaded {} to {:?}", filename, path);
    } else {
        tracing::info!("Using cached model from {:?}", path);
    }

    Ok(path)
}

/// Download a file from URL to path using ureq
fn download_file(url: &str, path: &Path) -> Result<(), ValidatorError> {
    let response = ureq::get(url).call().map_err(|e| {
        ValidatorError::DetectionUnavailable(format!("Failed to download {}: {}", url, e))
    })?;

    let buffer = response.into_body().read_to_vec().map_err(|e| {
        ValidatorError::DetectionUnavailable(format!("Failed to read response body: {}", e))
    })?;

    // Partial downloads never land at the final path
    let partial = path.with_extension("part");
    let mut file = File::create(&partial).map_err(|e| {
        ValidatorError::DetectionUnavailable(format!("Failed to create model file: {}", e))
    })?;
    file.write_all(&buffer).map_err(|e| {
        ValidatorError::DetectionUnavailable(format!("Failed to write model file: {}", e))
    })?;
    std::fs::rename(&partial, path).map_err(|e| {
        ValidatorError::DetectionUnavailable(format!("Failed to move model into place: {}", e))
    })?;

    Ok(())
}
