//! Preprocessor (stage B): blur, contrast enhancement, bilateral smoothing,
//! edge/threshold derivatives. Every derivative is a deterministic pure
//! function of the decoded grayscale raster.

use crate::decode::{from_image_luma, to_image_luma};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::{close, Norm};
use omr_core::GrayImage;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Tuning knobs for the preprocessor. Defaults match the constants in the
/// component design (§4.1); callers scanning at resolutions far from the
/// ~1440px-wide baseline should override these.
#[derive(Clone, Copy, Debug)]
pub struct PreprocessConfig {
    pub blur_sigma: f32,
    pub canny_low: f32,
    pub canny_high: f32,
    pub close_kernel_radius: u8,
    pub adaptive_block: i32,
    pub adaptive_offset: i32,
    pub clahe_clip_limit: f32,
    pub clahe_tile: usize,
    pub bilateral_diameter: i32,
    pub bilateral_sigma_color: f32,
    pub bilateral_sigma_space: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            blur_sigma: 1.1, // matches a 5x5 Gaussian kernel's implied sigma
            canny_low: 75.0,
            canny_high: 200.0,
            close_kernel_radius: 2, // LInf radius 2 approximates a 5x5 square kernel
            adaptive_block: 15,
            adaptive_offset: 3,
            clahe_clip_limit: 2.5,
            clahe_tile: 8,
            bilateral_diameter: 9,
            bilateral_sigma_color: 75.0,
            bilateral_sigma_space: 75.0,
        }
    }
}

/// Every derivative the region detector, rectifier and cell feature
/// extractor consume, computed once per source raster.
#[derive(Clone, Debug)]
pub struct Preprocessed {
    pub gray: GrayImage,
    pub blurred: GrayImage,
    pub edges_closed: GrayImage,
    pub otsu_binary: GrayImage,
    pub adaptive_inverted_binary: GrayImage,
    pub enhanced: GrayImage,
}

#[cfg_attr(feature = "tracing", instrument(skip(gray, cfg)))]
pub fn preprocess(gray: &GrayImage, cfg: &PreprocessConfig) -> Preprocessed {
    let src = to_image_luma(gray);

    let blurred_img = gaussian_blur_f32(&src, cfg.blur_sigma);
    let edges = canny(&blurred_img, cfg.canny_low, cfg.canny_high);
    let edges_closed_img = close(&edges, Norm::LInf, cfg.close_kernel_radius);

    let otsu_binary_img = {
        let level = otsu_level(&blurred_img);
        threshold(&blurred_img, level, ThresholdType::Binary)
    };

    let enhanced_img = bilateral_smooth(
        &clahe(&src, cfg.clahe_clip_limit, cfg.clahe_tile),
        cfg.bilateral_diameter,
        cfg.bilateral_sigma_color,
        cfg.bilateral_sigma_space,
    );

    let adaptive_img = adaptive_threshold_inverted(&src, cfg.adaptive_block, cfg.adaptive_offset);

    Preprocessed {
        gray: gray.clone(),
        blurred: from_image_luma(&blurred_img),
        edges_closed: from_image_luma(&edges_closed_img),
        otsu_binary: from_image_luma(&otsu_binary_img),
        adaptive_inverted_binary: from_image_luma(&adaptive_img),
        enhanced: from_image_luma(&enhanced_img),
    }
}

/// Contrast-limited adaptive histogram equalization over `tile x tile` cells,
/// bilinearly blending neighboring tile mappings at each pixel.
fn clahe(img: &image::GrayImage, clip_limit: f32, tile: usize) -> image::GrayImage {
    let (w, h) = (img.width() as usize, img.height() as usize);
    let tiles_x = w.div_ceil(tile).max(1);
    let tiles_y = h.div_ceil(tile).max(1);

    // Per-tile cumulative mapping function, 256 entries each.
    let mut mappings = vec![[0u8; 256]; tiles_x * tiles_y];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile;
            let y0 = ty * tile;
            let x1 = (x0 + tile).min(w);
            let y1 = (y0 + tile).min(h);
            mappings[ty * tiles_x + tx] = build_clahe_mapping(img, x0, y0, x1, y1, clip_limit);
        }
    }

    let mut out = image::GrayImage::new(w as u32, h as u32);
    for y in 0..h {
        for x in 0..w {
            let v = img.get_pixel(x as u32, y as u32).0[0] as usize;

            // Locate the four surrounding tile centers and bilinearly blend
            // their mappings, clamping at the raster edges.
            let fx = (x as f32 / tile as f32 - 0.5).max(0.0);
            let fy = (y as f32 / tile as f32 - 0.5).max(0.0);
            let tx0 = (fx.floor() as usize).min(tiles_x - 1);
            let ty0 = (fy.floor() as usize).min(tiles_y - 1);
            let tx1 = (tx0 + 1).min(tiles_x - 1);
            let ty1 = (ty0 + 1).min(tiles_y - 1);
            let ax = fx - tx0 as f32;
            let ay = fy - ty0 as f32;

            let m00 = mappings[ty0 * tiles_x + tx0][v] as f32;
            let m10 = mappings[ty0 * tiles_x + tx1][v] as f32;
            let m01 = mappings[ty1 * tiles_x + tx0][v] as f32;
            let m11 = mappings[ty1 * tiles_x + tx1][v] as f32;

            let top = m00 + ax * (m10 - m00);
            let bottom = m01 + ax * (m11 - m01);
            let blended = (top + ay * (bottom - top)).round().clamp(0.0, 255.0) as u8;

            out.put_pixel(x as u32, y as u32, image::Luma([blended]));
        }
    }
    out
}

fn build_clahe_mapping(img: &image::GrayImage, x0: usize, y0: usize, x1: usize, y1: usize, clip_limit: f32) -> [u8; 256] {
    let mut hist = [0u32; 256];
    let mut n = 0u32;
    for y in y0..y1 {
        for x in x0..x1 {
            hist[img.get_pixel(x as u32, y as u32).0[0] as usize] += 1;
            n += 1;
        }
    }
    if n == 0 {
        return std::array::from_fn(|i| i as u8);
    }

    // Clip the histogram and redistribute the excess uniformly, as in
    // standard CLAHE (clip limit expressed relative to the mean bin count).
    let clip = ((clip_limit * n as f32 / 256.0).max(1.0)) as u32;
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > clip {
            excess += *bin - clip;
            *bin = clip;
        }
    }
    let redistribute = excess / 256;
    let remainder = excess % 256;
    for (i, bin) in hist.iter_mut().enumerate() {
        *bin += redistribute;
        if (i as u32) < remainder {
            *bin += 1;
        }
    }

    let mut cdf = [0u32; 256];
    let mut running = 0u32;
    for (i, &count) in hist.iter().enumerate() {
        running += count;
        cdf[i] = running;
    }

    let mut mapping = [0u8; 256];
    for (i, &cum) in cdf.iter().enumerate() {
        mapping[i] = ((cum as f32 / n as f32) * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    mapping
}

/// Hand-rolled bilateral filter: a Gaussian in pixel distance weighted by a
/// Gaussian in intensity difference, so edges survive smoothing.
fn bilateral_smooth(img: &image::GrayImage, diameter: i32, sigma_color: f32, sigma_space: f32) -> image::GrayImage {
    let (w, h) = (img.width() as i32, img.height() as i32);
    let radius = diameter / 2;
    let mut out = image::GrayImage::new(w as u32, h as u32);

    let space_coeff = -1.0 / (2.0 * sigma_space * sigma_space);
    let color_coeff = -1.0 / (2.0 * sigma_color * sigma_color);

    for y in 0..h {
        for x in 0..w {
            let center = img.get_pixel(x as u32, y as u32).0[0] as f32;
            let mut sum = 0.0f32;
            let mut weight_sum = 0.0f32;

            for dy in -radius..=radius {
                let ny = y + dy;
                if ny < 0 || ny >= h {
                    continue;
                }
                for dx in -radius..=radius {
                    let nx = x + dx;
                    if nx < 0 || nx >= w {
                        continue;
                    }
                    let neighbor = img.get_pixel(nx as u32, ny as u32).0[0] as f32;
                    let space_dist2 = (dx * dx + dy * dy) as f32;
                    let color_dist2 = (neighbor - center) * (neighbor - center);
                    let weight = (space_coeff * space_dist2 + color_coeff * color_dist2).exp();
                    sum += weight * neighbor;
                    weight_sum += weight;
                }
            }

            let value = if weight_sum > 0.0 { sum / weight_sum } else { center };
            out.put_pixel(x as u32, y as u32, image::Luma([value.round().clamp(0.0, 255.0) as u8]));
        }
    }
    out
}

/// Adaptive inverted binary: foreground (255) where a pixel is darker than
/// its local neighborhood mean minus `offset`. The local mean is computed
/// from an integral image as a box-filter approximation of the Gaussian
/// weighting OpenCV's `ADAPTIVE_THRESH_GAUSSIAN_C` performs.
fn adaptive_threshold_inverted(img: &image::GrayImage, block: i32, offset: i32) -> image::GrayImage {
    let (w, h) = (img.width() as usize, img.height() as usize);
    let radius = (block / 2).max(1) as usize;
    let integral = integral_image(img);

    let mut out = image::GrayImage::new(w as u32, h as u32);
    for y in 0..h {
        for x in 0..w {
            let local_mean = region_mean(&integral, w, h, x, y, radius);
            let pixel = img.get_pixel(x as u32, y as u32).0[0] as f64;
            let fg = pixel < local_mean - offset as f64;
            out.put_pixel(x as u32, y as u32, image::Luma([if fg { 255 } else { 0 }]));
        }
    }
    out
}

fn integral_image(img: &image::GrayImage) -> Vec<u64> {
    let (w, h) = (img.width() as usize, img.height() as usize);
    let stride = w + 1;
    let mut table = vec![0u64; stride * (h + 1)];
    for y in 0..h {
        let mut row_sum = 0u64;
        for x in 0..w {
            row_sum += img.get_pixel(x as u32, y as u32).0[0] as u64;
            table[(y + 1) * stride + (x + 1)] = row_sum + table[y * stride + (x + 1)];
        }
    }
    table
}

fn region_mean(integral: &[u64], w: usize, h: usize, cx: usize, cy: usize, radius: usize) -> f64 {
    let stride = w + 1;
    let x1 = cx.saturating_sub(radius);
    let y1 = cy.saturating_sub(radius);
    let x2 = (cx + radius + 1).min(w);
    let y2 = (cy + radius + 1).min(h);
    let area = ((x2 - x1) * (y2 - y1)) as f64;
    if area == 0.0 {
        return 128.0;
    }
    let sum = integral[y2 * stride + x2] as f64 - integral[y1 * stride + x2] as f64 - integral[y2 * stride + x1] as f64
        + integral[y1 * stride + x1] as f64;
    sum / area
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard(w: u32, h: u32) -> image::GrayImage {
        image::GrayImage::from_fn(w, h, |x, y| image::Luma([if (x + y) % 2 == 0 { 240 } else { 10 }]))
    }

    #[test]
    fn clahe_preserves_dimensions() {
        let img = checkerboard(32, 32);
        let out = clahe(&img, 2.5, 8);
        assert_eq!(out.dimensions(), img.dimensions());
    }

    #[test]
    fn bilateral_smooth_reduces_salt_and_pepper_variance() {
        let img = checkerboard(16, 16);
        let smoothed = bilateral_smooth(&img, 9, 75.0, 75.0);
        let orig_std = pixel_std(&img);
        let smooth_std = pixel_std(&smoothed);
        assert!(smooth_std < orig_std);
    }

    fn pixel_std(img: &image::GrayImage) -> f64 {
        let values: Vec<f64> = img.pixels().map(|p| p.0[0] as f64).collect();
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
    }

    #[test]
    fn adaptive_threshold_marks_locally_dark_pixels() {
        // Uniform bright background with one dark pixel cluster.
        let mut img = image::GrayImage::from_pixel(40, 40, image::Luma([200]));
        for y in 18..22 {
            for x in 18..22 {
                img.put_pixel(x, y, image::Luma([20]));
            }
        }
        let out = adaptive_threshold_inverted(&img, 15, 3);
        assert_eq!(out.get_pixel(20, 20).0[0], 255);
        assert_eq!(out.get_pixel(2, 2).0[0], 0);
    }

    #[test]
    fn preprocess_produces_all_derivatives_at_source_size() {
        let gray = omr_core::GrayImage::new(32, 32, vec![128u8; 32 * 32]);
        let cfg = PreprocessConfig::default();
        let pre = preprocess(&gray, &cfg);
        for raster in [&pre.blurred, &pre.edges_closed, &pre.otsu_binary, &pre.adaptive_inverted_binary, &pre.enhanced] {
            assert_eq!(raster.width, 32);
            assert_eq!(raster.height, 32);
        }
    }
}
