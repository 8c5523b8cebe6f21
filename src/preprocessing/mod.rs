//! Image preprocessing ahead of OCR
//!
//! Turns a color report scan into a clean binarized image that Tesseract
//! reads reliably.

pub mod pipeline;
pub mod steps;

pub use pipeline::{Pipeline, StepTiming};
