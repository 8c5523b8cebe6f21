use crate::error::LabError;
use image::{DynamicImage, GrayImage, Luma};
use std::thread;

/// Filter strength; larger values smooth more aggressively
const FILTER_STRENGTH: f64 = 3.0;
/// Side of the patch compared around each pixel
const TEMPLATE_WINDOW: usize = 7;
/// Side of the area searched for similar patches
const SEARCH_WINDOW: usize = 21;
/// Weights below this contribute nothing
const WEIGHT_THRESHOLD: f64 = 0.001;

/// Non-local means denoising
/// Removes speckle left behind by binarization while keeping stroke edges
pub fn apply(image: DynamicImage) -> Result<DynamicImage, LabError> {
    let gray = image.to_luma8();
    let denoised = non_local_means(&gray, FILTER_STRENGTH, TEMPLATE_WINDOW, SEARCH_WINDOW);
    Ok(DynamicImage::ImageLuma8(denoised))
}

/// Patch weights looked up by template area and integer sum of squared
/// differences. Each row stops at the first weight below the threshold.
struct WeightTable {
    by_area: Vec<Vec<f32>>,
}

impl WeightTable {
    fn new(h: f64, template: usize) -> Self {
        let h_sq = h * h;
        let by_area = (0..=template * template)
            .map(|area| {
                if area == 0 {
                    return Vec::new();
                }
                (0u32..)
                    .map(|ssd| (-(ssd as f64 / area as f64) / h_sq).exp())
                    .take_while(|weight| *weight >= WEIGHT_THRESHOLD)
                    .map(|weight| weight as f32)
                    .collect()
            })
            .collect();
        Self { by_area }
    }

    fn weight(&self, area: usize, ssd: u64) -> Option<f32> {
        let row = self.by_area.get(area)?;
        usize::try_from(ssd).ok().and_then(|i| row.get(i).copied())
    }
}

/// Geometry shared by every band
struct Window {
    width: usize,
    height: usize,
    t_radius: usize,
    s_radius: isize,
}

/// For every search offset the squared difference between the image and its
/// shifted copy is summed over template windows with an integral image, so
/// each pixel's patch distance costs O(1) per offset. Output rows are split
/// into bands that run on separate threads.
fn non_local_means(img: &GrayImage, h: f64, template: usize, search: usize) -> GrayImage {
    let (width, height) = img.dimensions();
    let (w, hgt) = (width as usize, height as usize);
    if w == 0 || hgt == 0 {
        return img.clone();
    }

    let src = img.as_raw();
    let table = WeightTable::new(h, template);
    let window = Window {
        width: w,
        height: hgt,
        t_radius: template / 2,
        s_radius: (search / 2) as isize,
    };

    let threads = thread::available_parallelism().map_or(1, |n| n.get());
    let band_rows = hgt.div_ceil(threads).max(1);
    let mut out = vec![0u8; w * hgt];

    thread::scope(|scope| {
        for (band, rows) in out.chunks_mut(band_rows * w).enumerate() {
            let (table, window) = (&table, &window);
            scope.spawn(move || denoise_band(src, window, table, band * band_rows, rows));
        }
    });

    GrayImage::from_fn(width, height, |x, y| {
        Luma([out[y as usize * w + x as usize]])
    })
}

/// Denoise output rows starting at `y0` into `out`
fn denoise_band(src: &[u8], win: &Window, table: &WeightTable, y0: usize, out: &mut [u8]) {
    let (w, hgt) = (win.width, win.height);
    let rows = out.len() / w;

    // integral rows cover the band plus the template halo
    let top = y0.saturating_sub(win.t_radius);
    let bottom = (y0 + rows + win.t_radius).min(hgt);

    let mut weight_sum = vec![0.0f32; rows * w];
    let mut value_sum = vec![0.0f32; rows * w];
    let mut integral = vec![0u64; (w + 1) * (bottom - top + 1)];

    for dy in -win.s_radius..=win.s_radius {
        for dx in -win.s_radius..=win.s_radius {
            fill_diff_integral(src, w, hgt, top..bottom, dx, dy, &mut integral);

            for row in 0..rows {
                let y = y0 + row;
                let y1 = y.saturating_sub(win.t_radius);
                let y2 = (y + win.t_radius).min(hgt - 1) + 1;
                for x in 0..w {
                    let x1 = x.saturating_sub(win.t_radius);
                    let x2 = (x + win.t_radius).min(w - 1) + 1;

                    let ssd = window_sum(&integral, w + 1, x1, y1 - top, x2, y2 - top);
                    let area = (x2 - x1) * (y2 - y1);
                    let Some(weight) = table.weight(area, ssd) else {
                        continue;
                    };

                    let idx = row * w + x;
                    weight_sum[idx] += weight;
                    value_sum[idx] += weight * src[shifted(x, y, dx, dy, w, hgt)] as f32;
                }
            }
        }
    }

    for (idx, pixel) in out.iter_mut().enumerate() {
        // zero offset always contributes weight 1, so the sum is never zero
        let value = value_sum[idx] / weight_sum[idx];
        *pixel = value.round().clamp(0.0, 255.0) as u8;
    }
}

/// Index of the pixel at `(x + dx, y + dy)`, clamped to the image
fn shifted(x: usize, y: usize, dx: isize, dy: isize, w: usize, h: usize) -> usize {
    let sx = (x as isize + dx).clamp(0, w as isize - 1) as usize;
    let sy = (y as isize + dy).clamp(0, h as isize - 1) as usize;
    sy * w + sx
}

/// Integral image of `(I(p) - I(p + offset))^2` over image rows `rows`
fn fill_diff_integral(
    src: &[u8],
    w: usize,
    h: usize,
    rows: std::ops::Range<usize>,
    dx: isize,
    dy: isize,
    out: &mut [u64],
) {
    let stride = w + 1;
    for (local, y) in rows.enumerate() {
        let mut row_sum = 0u64;
        for x in 0..w {
            let diff = src[y * w + x] as i64 - src[shifted(x, y, dx, dy, w, h)] as i64;
            row_sum += (diff * diff) as u64;
            out[(local + 1) * stride + x + 1] = out[local * stride + x + 1] + row_sum;
        }
    }
}

fn window_sum(integral: &[u64], stride: usize, x1: usize, y1: usize, x2: usize, y2: usize) -> u64 {
    integral[y2 * stride + x2] + integral[y1 * stride + x1]
        - integral[y1 * stride + x2]
        - integral[y2 * stride + x1]
}
