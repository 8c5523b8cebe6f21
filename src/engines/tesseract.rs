//! Tesseract engine implementation
//!
//! Runs the system `tesseract` executable on a temporary PNG and reads the
//! recognized text from stdout.

use crate::config::OcrSettings;
use crate::engine::OcrEngine;
use crate::error::LabError;
use image::GrayImage;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Install locations checked when `tesseract` is not on PATH
const FALLBACK_LOCATIONS: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR\tesseract.exe",
    r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
    "/usr/bin/tesseract",
    "/usr/local/bin/tesseract",
    "/opt/homebrew/bin/tesseract",
    "/opt/local/bin/tesseract",
];

#[cfg(windows)]
const EXECUTABLE_NAMES: &[&str] = &["tesseract.exe", "tesseract"];
#[cfg(not(windows))]
const EXECUTABLE_NAMES: &[&str] = &["tesseract"];

/// Resolve the tesseract executable
///
/// An explicit path is never replaced by a discovered one; if it does not
/// exist the engine is unavailable.
pub fn locate_tesseract(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.is_file().then(|| path.to_path_buf());
    }

    search_path().or_else(|| {
        FALLBACK_LOCATIONS
            .iter()
            .map(PathBuf::from)
            .find(|candidate| candidate.is_file())
    })
}

fn search_path() -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var).find_map(|dir| {
        EXECUTABLE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    })
}

/// Tesseract OCR Engine
pub struct TesseractEngine {
    command: PathBuf,
    settings: OcrSettings,
}

impl TesseractEngine {
    pub fn new(command: PathBuf, settings: OcrSettings) -> Self {
        tracing::info!(
            "Tesseract engine ready (command: {}, language: {}, psm: {}, oem: {}, dpi: {})",
            command.display(),
            settings.language,
            settings.psm,
            settings.oem,
            settings.dpi
        );
        Self { command, settings }
    }

    /// Arguments following `<input> stdout`
    fn config_args(&self) -> Vec<String> {
        vec![
            "--oem".to_string(),
            self.settings.oem.to_string(),
            "--psm".to_string(),
            self.settings.psm.to_string(),
            "-l".to_string(),
            self.settings.language.clone(),
            "--dpi".to_string(),
            self.settings.dpi.to_string(),
        ]
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn recognize(&self, image: &GrayImage) -> Result<String, LabError> {
        let input = tempfile::Builder::new()
            .prefix("lab-report-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| LabError::Internal(format!("Failed to create temp file: {}", e)))?;

        image
            .save_with_format(input.path(), image::ImageFormat::Png)
            .map_err(|e| LabError::Internal(format!("Failed to write temp image: {}", e)))?;

        let output = Command::new(&self.command)
            .arg(input.path())
            .arg("stdout")
            .args(self.config_args())
            .output()
            .map_err(|e| LabError::Ocr(format!("Failed to execute tesseract: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LabError::Ocr(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        tracing::debug!("Tesseract returned {} chars", text.len());
        Ok(text)
    }
}
