use crate::error::LabError;
use image::GrayImage;

/// Trait that all OCR engines must implement
pub trait OcrEngine: Send + Sync {
    /// Returns the engine identifier (e.g., "tesseract")
    fn name(&self) -> &'static str;

    /// Recognize the text of a preprocessed report image
    fn recognize(&self, image: &GrayImage) -> Result<String, LabError>;
}
