//! OCR engine implementations

pub mod tesseract;

use crate::config::Config;
use crate::engine::OcrEngine;
use std::sync::Arc;

pub use tesseract::{locate_tesseract, TesseractEngine};

/// Build the configured engine, or `None` when no tesseract was found at startup
pub fn build_engine(config: &Config) -> Option<Arc<dyn OcrEngine>> {
    let command = config.tesseract_cmd.clone()?;
    Some(Arc::new(TesseractEngine::new(command, config.ocr.clone())))
}
