use crate::error::LabError;
use image::{DynamicImage, GrayImage};
use serde::Serialize;
use std::time::Instant;

use super::steps;

type StepFn = fn(DynamicImage) -> Result<DynamicImage, LabError>;

/// Fixed step order: grayscale, threshold, denoise, dilate
const STEPS: [(&str, StepFn); 4] = [
    ("grayscale", steps::grayscale::apply),
    ("threshold", steps::threshold::apply),
    ("denoise", steps::denoise::apply),
    ("dilate", steps::dilate::apply),
];

/// Timing information for a single preprocessing step
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// Result of preprocessing including timing stats
#[derive(Debug, Clone, Serialize)]
pub struct PreprocessingResult {
    /// Preprocessed image (not serialized)
    #[serde(skip)]
    pub image: GrayImage,
    /// Total preprocessing time in milliseconds
    pub total_time_ms: u64,
    /// Individual step timings
    pub steps: Vec<StepTiming>,
}

/// Preprocessing pipeline applied to every report before OCR
#[derive(Debug, Clone, Copy, Default)]
pub struct Pipeline;

impl Pipeline {
    pub fn new() -> Self {
        Self
    }

    /// Run every step in order on an RGB image
    pub fn process(&self, image: DynamicImage) -> Result<PreprocessingResult, LabError> {
        let start = Instant::now();
        let mut steps_timing = Vec::with_capacity(STEPS.len());

        let mut img = DynamicImage::ImageRgb8(image.into_rgb8());
        for (name, step_fn) in STEPS {
            img = self.run_step(name, img, &mut steps_timing, step_fn)?;
        }

        let result = PreprocessingResult {
            image: img.into_luma8(),
            total_time_ms: start.elapsed().as_millis() as u64,
            steps: steps_timing,
        };

        tracing::debug!(
            "Preprocessed {}x{} image in {}ms",
            result.image.width(),
            result.image.height(),
            result.total_time_ms
        );

        Ok(result)
    }

    fn run_step<F>(
        &self,
        name: &str,
        img: DynamicImage,
        timings: &mut Vec<StepTiming>,
        step_fn: F,
    ) -> Result<DynamicImage, LabError>
    where
        F: FnOnce(DynamicImage) -> Result<DynamicImage, LabError>,
    {
        let step_start = Instant::now();
        let result = step_fn(img)?;
        timings.push(StepTiming {
            name: name.to_string(),
            time_ms: step_start.elapsed().as_millis() as u64,
        });
        Ok(result)
    }
}
