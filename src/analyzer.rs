//! Report analysis: decode, preprocess, recognize, extract

use crate::engine::OcrEngine;
use crate::error::LabError;
use crate::extraction::{extract_lab_data, LabTestRecord};
use crate::preprocessing::{Pipeline, StepTiming};
use image::{DynamicImage, ImageReader};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Outcome of analyzing one report image
#[derive(Debug, Clone)]
pub struct Analysis {
    pub records: Vec<LabTestRecord>,
    pub text_len: usize,
    pub preprocessing_ms: u64,
    pub steps: Vec<StepTiming>,
}

/// Runs one image through the whole pipeline; holds no per-request state
pub struct ReportAnalyzer {
    engine: Arc<dyn OcrEngine>,
    pipeline: Pipeline,
}

impl ReportAnalyzer {
    pub fn new(engine: Arc<dyn OcrEngine>) -> Self {
        Self {
            engine,
            pipeline: Pipeline::new(),
        }
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// Analyze an uploaded image held in memory
    pub fn analyze_bytes(&self, data: &[u8]) -> Result<Analysis, LabError> {
        let image =
            image::load_from_memory(data).map_err(|e| LabError::ImageDecode(e.to_string()))?;
        self.analyze_image(image)
    }

    /// Analyze an image file on disk; the format is sniffed from content
    pub fn analyze_path(&self, path: &Path) -> Result<Analysis, LabError> {
        let image = ImageReader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|e| LabError::ImageDecode(format!("{}: {}", path.display(), e)))?
            .decode()
            .map_err(|e| LabError::ImageDecode(e.to_string()))?;
        self.analyze_image(image)
    }

    fn analyze_image(&self, image: DynamicImage) -> Result<Analysis, LabError> {
        let start = Instant::now();
        let rgb = DynamicImage::ImageRgb8(image.into_rgb8());

        let preprocessed = self.pipeline.process(rgb)?;
        let text = self.engine.recognize(&preprocessed.image)?;
        tracing::debug!("Extracted text:\n{}", text);

        let records = extract_lab_data(&text);

        tracing::info!(
            "Analyzed report with {} in {}ms: {} chars, {} tests",
            self.engine.name(),
            start.elapsed().as_millis(),
            text.len(),
            records.len()
        );

        Ok(Analysis {
            records,
            text_len: text.len(),
            preprocessing_ms: preprocessed.total_time_ms,
            steps: preprocessed.steps,
        })
    }
}
