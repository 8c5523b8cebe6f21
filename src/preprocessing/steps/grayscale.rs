use crate::error::LabError;
use image::{DynamicImage, GrayImage, Luma};

/// BT.601 luma weights in 14-bit fixed point (0.299, 0.587, 0.114)
const RED_WEIGHT: u32 = 4899;
const GREEN_WEIGHT: u32 = 9617;
const BLUE_WEIGHT: u32 = 1868;
const SHIFT: u32 = 14;

/// Convert the RGB report scan to single-channel luma
pub fn apply(image: DynamicImage) -> Result<DynamicImage, LabError> {
    let rgb = image.into_rgb8();
    let gray = GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        Luma([bt601_luma(r, g, b)])
    });
    Ok(DynamicImage::ImageLuma8(gray))
}

fn bt601_luma(r: u8, g: u8, b: u8) -> u8 {
    let weighted = r as u32 * RED_WEIGHT + g as u32 * GREEN_WEIGHT + b as u32 * BLUE_WEIGHT;
    ((weighted + (1 << (SHIFT - 1))) >> SHIFT) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_grayscale_converts_color() {
        let mut img = RgbImage::new(10, 10);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 0, Rgb([0, 255, 0]));
        img.put_pixel(2, 0, Rgb([0, 0, 255]));

        let result = apply(DynamicImage::ImageRgb8(img)).unwrap();
        assert!(matches!(result, DynamicImage::ImageLuma8(_)));

        let gray = result.to_luma8();
        assert!(gray.get_pixel(0, 0).0[0] > 0);
        assert!(gray.get_pixel(1, 0).0[0] > 0);
        assert!(gray.get_pixel(2, 0).0[0] > 0);
        assert_eq!(gray.get_pixel(3, 0).0[0], 0);
    }

    #[test]
    fn test_grayscale_preserves_dimensions() {
        let img = RgbImage::new(100, 50);
        let result = apply(DynamicImage::ImageRgb8(img)).unwrap();
        assert_eq!(result.width(), 100);
        assert_eq!(result.height(), 50);
    }

    #[test]
    fn test_grayscale_uses_bt601_weights() {
        let mut img = RgbImage::new(5, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 0, Rgb([0, 255, 0]));
        img.put_pixel(2, 0, Rgb([0, 0, 255]));
        img.put_pixel(3, 0, Rgb([255, 255, 255]));
        img.put_pixel(4, 0, Rgb([100, 100, 100]));

        let gray = apply(DynamicImage::ImageRgb8(img)).unwrap().to_luma8();

        assert_eq!(gray.get_pixel(0, 0).0[0], 76);
        assert_eq!(gray.get_pixel(1, 0).0[0], 150);
        assert_eq!(gray.get_pixel(2, 0).0[0], 29);
        assert_eq!(gray.get_pixel(3, 0).0[0], 255);
        assert_eq!(gray.get_pixel(4, 0).0[0], 100);
    }
}
