use crate::error::LabError;
use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use imageproc::filter::separable_filter_equal;

/// Neighbourhood size for the local mean
const BLOCK_SIZE: usize = 11;
/// Subtracted from the local mean before comparison
const OFFSET: i32 = 2;

/// Binarize with a Gaussian-weighted local threshold
/// Copes with uneven lighting across phone photos of reports
pub fn apply(image: DynamicImage) -> Result<DynamicImage, LabError> {
    let gray = image.to_luma8();
    let binarized = adaptive_gaussian_threshold(&gray, BLOCK_SIZE, OFFSET);
    Ok(DynamicImage::ImageLuma8(binarized))
}

/// Pixel becomes white when `pixel - local_mean > -offset`, black otherwise
fn adaptive_gaussian_threshold(img: &GrayImage, block_size: usize, offset: i32) -> GrayImage {
    let means = local_means(img, &gaussian_kernel(block_size));

    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let pixel = img.get_pixel(x, y).0[0] as i32;
        let mean = means.get_pixel(x, y).0[0] as i32;
        if pixel - mean > -offset {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Normalized 1-D Gaussian with sigma derived from the kernel size
fn gaussian_kernel(size: usize) -> Vec<f32> {
    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let center = (size / 2) as f32;
    let weights: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - center;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let total: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

/// Separable Gaussian blur (edges replicated), rounded back to u8
fn local_means(img: &GrayImage, kernel: &[f32]) -> GrayImage {
    let levels: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_fn(img.width(), img.height(), |x, y| {
            Luma([img.get_pixel(x, y).0[0] as f32])
        });
    let blurred = separable_filter_equal(&levels, kernel);

    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        Luma([blurred.get_pixel(x, y).0[0].round().clamp(0.0, 255.0) as u8])
    })
}
