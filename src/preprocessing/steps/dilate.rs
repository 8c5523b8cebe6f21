use crate::error::LabError;
use image::{DynamicImage, GrayImage, Luma};
use imageproc::morphology::{grayscale_dilate, Mask};

/// Structuring element is a 2x1 rectangle anchored at its right cell,
/// covering the pixel itself and its left neighbour
const KERNEL_WIDTH: u32 = 2;
const ANCHOR_X: u8 = 1;

/// One iteration of grayscale dilation
pub fn apply(image: DynamicImage) -> Result<DynamicImage, LabError> {
    let gray = image.to_luma8();
    let element = GrayImage::from_pixel(KERNEL_WIDTH, 1, Luma([255]));
    let mask = Mask::from_image(&element, ANCHOR_X, 0);
    Ok(DynamicImage::ImageLuma8(grayscale_dilate(&gray, &mask)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dilate_extends_bright_pixel_right() {
        let mut img = GrayImage::from_pixel(10, 3, Luma([0]));
        img.put_pixel(5, 1, Luma([255]));

        let result = apply(DynamicImage::ImageLuma8(img)).unwrap().to_luma8();

        assert_eq!(result.get_pixel(4, 1).0[0], 0);
        assert_eq!(result.get_pixel(5, 1).0[0], 255);
        assert_eq!(result.get_pixel(6, 1).0[0], 255);
        assert_eq!(result.get_pixel(7, 1).0[0], 0);
        assert_eq!(result.get_pixel(5, 0).0[0], 0);
        assert_eq!(result.get_pixel(5, 2).0[0], 0);
    }

    #[test]
    fn test_dilate_left_edge_uses_only_itself() {
        let mut img = GrayImage::from_pixel(4, 1, Luma([10]));
        img.put_pixel(0, 0, Luma([0]));
        img.put_pixel(3, 0, Luma([200]));

        let result = apply(DynamicImage::ImageLuma8(img)).unwrap().to_luma8();

        assert_eq!(result.get_pixel(0, 0).0[0], 0);
        assert_eq!(result.get_pixel(1, 0).0[0], 10);
        assert_eq!(result.get_pixel(3, 0).0[0], 200);
    }

    #[test]
    fn test_dilate_preserves_dimensions() {
        let img = GrayImage::new(13, 7);
        let result = apply(DynamicImage::ImageLuma8(img)).unwrap();
        assert_eq!(result.width(), 13);
        assert_eq!(result.height(), 7);
    }

    #[test]
    fn test_dilate_takes_max_of_left_neighbour() {
        let img = GrayImage::from_fn(23, 5, |x, y| Luma([((x * 37 + y * 91) % 256) as u8]));

        let result = apply(DynamicImage::ImageLuma8(img.clone())).unwrap().to_luma8();

        for (x, y, pixel) in result.enumerate_pixels() {
            let own = img.get_pixel(x, y).0[0];
            let expected = match x {
                0 => own,
                _ => own.max(img.get_pixel(x - 1, y).0[0]),
            };
            assert_eq!(pixel.0[0], expected, "at ({}, {})", x, y);
        }
    }
}
