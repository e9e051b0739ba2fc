// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan enhancement — global and adaptive binarization, morphological
// cleanup, and contrast-limited adaptive histogram equalization for
// photographed document pages.

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{close, open};
use lesewerk_core::error::{LesewerkError, Result};
use tracing::{debug, info, instrument};

/// Binarization and local-contrast operations on a grayscale page.
///
/// Like [`ImageProcessor`](crate::image::ImageProcessor), every operation
/// consumes `self` and returns the transformed enhancer.
pub struct ScanEnhancer {
    /// The working image.
    image: GrayImage,
}

impl ScanEnhancer {
    // -- Construction ---------------------------------------------------------

    pub fn from_gray(image: GrayImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn into_gray(self) -> GrayImage {
        self.image
    }

    // -- Binarization ---------------------------------------------------------

    /// Apply adaptive thresholding to produce a black-and-white image.
    ///
    /// Uses a local mean approach: for each pixel, the threshold is the mean
    /// intensity within a `block_radius` neighbourhood, minus a constant `c`.
    /// Pixels darker than the local threshold become black; others become white.
    ///
    /// A typical `block_radius` is 15 and `c` is 10.
    #[instrument(skip(self), fields(block_radius, c))]
    pub fn binarize(self, block_radius: u32, c: i32) -> Self {
        info!(block_radius, c, "Applying adaptive binarization");

        let gray = self.image;
        let (width, height) = gray.dimensions();

        // Integral image for O(1) local means.
        let integral = compute_integral_image(&gray);

        let mut output = GrayImage::new(width, height);

        for y in 0..height {
            for x in 0..width {
                let local_mean = region_mean(&integral, width, height, x, y, block_radius);
                let threshold = (local_mean as i32 - c).clamp(0, 255) as u8;
                let pixel_val = gray.get_pixel(x, y).0[0];
                let binary = if pixel_val < threshold { 0u8 } else { 255u8 };
                output.put_pixel(x, y, Luma([binary]));
            }
        }

        debug!("Binarization complete");
        Self { image: output }
    }

    /// Global binarization with the threshold chosen by Otsu's method.
    ///
    /// Pixels at or below the threshold become black.
    #[instrument(skip(self))]
    pub fn binarize_otsu(self) -> Self {
        let threshold = otsu_threshold(&self.image);
        info!(threshold, "Applying Otsu binarization");

        let (width, height) = self.image.dimensions();
        let mut output = GrayImage::new(width, height);

        for (x, y, pixel) in self.image.enumerate_pixels() {
            let binary = if pixel.0[0] <= threshold { 0u8 } else { 255u8 };
            output.put_pixel(x, y, Luma([binary]));
        }

        Self { image: output }
    }

    // -- Morphology -----------------------------------------------------------

    /// Morphological open then close with a 3×3 square element, one
    /// iteration each: open removes isolated specks, close bridges hairline
    /// gaps in strokes.
    #[instrument(skip(self))]
    pub fn open_close(self) -> Self {
        debug!("Applying 3x3 open + close");
        let opened = open(&self.image, Norm::LInf, 1);
        Self {
            image: close(&opened, Norm::LInf, 1),
        }
    }

    // -- Local contrast -------------------------------------------------------

    /// Contrast-limited adaptive histogram equalization.
    ///
    /// The page is split into `tiles` × `tiles` regions; each region's
    /// histogram is clipped at `clip_limit` × the mean bin height, the excess
    /// redistributed evenly, and the resulting lookup tables blended
    /// bilinearly between neighbouring tile centres.
    ///
    /// Fails when a tile would be narrower than two pixels.
    #[instrument(skip(self), fields(tiles, clip_limit))]
    pub fn equalize_clahe(self, tiles: u32, clip_limit: f32) -> Result<Self> {
        let (width, height) = self.image.dimensions();
        if tiles == 0 || width < tiles * 2 || height < tiles * 2 {
            return Err(LesewerkError::VariantGeneration {
                strategy: "clahe".into(),
                reason: format!("{width}x{height} is too small for a {tiles}x{tiles} tile grid"),
            });
        }
        info!(tiles, clip_limit, "Applying CLAHE");

        let n = tiles as usize;
        let mut luts = vec![[0u8; 256]; n * n];
        for ty in 0..tiles {
            let (y0, y1) = tile_span(ty, tiles, height);
            for tx in 0..tiles {
                let (x0, x1) = tile_span(tx, tiles, width);
                let mut histogram = [0u32; 256];
                for y in y0..y1 {
                    for x in x0..x1 {
                        histogram[self.image.get_pixel(x, y).0[0] as usize] += 1;
                    }
                }
                let area = (x1 - x0) * (y1 - y0);
                luts[ty as usize * n + tx as usize] = clipped_equalization(histogram, area, clip_limit);
            }
        }

        let tile_w = width as f32 / tiles as f32;
        let tile_h = height as f32 / tiles as f32;
        let last = n - 1;
        let mut output = GrayImage::new(width, height);

        for (x, y, pixel) in self.image.enumerate_pixels() {
            let value = pixel.0[0] as usize;
            let (tx0, tx1, ax) = neighbour_tiles((x as f32 + 0.5) / tile_w - 0.5, last);
            let (ty0, ty1, ay) = neighbour_tiles((y as f32 + 0.5) / tile_h - 0.5, last);

            let top = f32::from(luts[ty0 * n + tx0][value]) * (1.0 - ax)
                + f32::from(luts[ty0 * n + tx1][value]) * ax;
            let bottom = f32::from(luts[ty1 * n + tx0][value]) * (1.0 - ax)
                + f32::from(luts[ty1 * n + tx1][value]) * ax;
            let blended = top * (1.0 - ay) + bottom * ay;
            output.put_pixel(x, y, Luma([blended.round().clamp(0.0, 255.0) as u8]));
        }

        debug!("CLAHE complete");
        Ok(Self { image: output })
    }
}

// -- Integral image helpers ---------------------------------------------------

/// Compute the integral (summed-area table) of a grayscale image.
///
/// `integral[y * (width+1) + x]` contains the sum of all pixel values in the
/// rectangle [0, 0) to (x, y) (exclusive on both axes). The table has
/// dimensions `(width+1) x (height+1)` with a zero-padded border.
fn compute_integral_image(gray: &GrayImage) -> Vec<u64> {
    let (w, h) = gray.dimensions();
    let stride = (w + 1) as usize;
    let mut table = vec![0u64; stride * (h + 1) as usize];

    for y in 0..h {
        let mut row_sum: u64 = 0;
        for x in 0..w {
            row_sum += gray.get_pixel(x, y).0[0] as u64;
            let idx = (y + 1) as usize * stride + (x + 1) as usize;
            let above = y as usize * stride + (x + 1) as usize;
            table[idx] = row_sum + table[above];
        }
    }

    table
}

/// Mean pixel value within a square region centred on (cx, cy) with the
/// given radius, using the precomputed integral image.
fn region_mean(
    integral: &[u64],
    img_width: u32,
    img_height: u32,
    cx: u32,
    cy: u32,
    radius: u32,
) -> f64 {
    let stride = (img_width + 1) as usize;

    // Clamp the region to image bounds.
    let x1 = cx.saturating_sub(radius) as usize;
    let y1 = cy.saturating_sub(radius) as usize;
    let x2 = (cx as usize + radius as usize + 1).min(img_width as usize);
    let y2 = (cy as usize + radius as usize + 1).min(img_height as usize);

    let area = ((x2 - x1) * (y2 - y1)) as f64;
    if area == 0.0 {
        return 128.0;
    }

    // S = I[y2][x2] - I[y1][x2] - I[y2][x1] + I[y1][x1]
    let sum = integral[y2 * stride + x2] as f64
        - integral[y1 * stride + x2] as f64
        - integral[y2 * stride + x1] as f64
        + integral[y1 * stride + x1] as f64;

    sum / area
}

/// Compute the Otsu threshold for a grayscale image.
///
/// Finds the threshold value that maximises the between-class variance of
/// the dark and light pixel groups.
pub(crate) fn otsu_threshold(gray: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total_pixels = gray.width() as u64 * gray.height() as u64;
    if total_pixels == 0 {
        return 128;
    }

    let mut sum_total: f64 = 0.0;
    for (i, &count) in histogram.iter().enumerate() {
        sum_total += i as f64 * count as f64;
    }

    let mut sum_background: f64 = 0.0;
    let mut weight_background: u64 = 0;
    let mut max_variance: f64 = 0.0;
    let mut best_threshold: u8 = 0;

    for (t, &count) in histogram.iter().enumerate() {
        weight_background += count;
        if weight_background == 0 {
            continue;
        }
        let weight_foreground = total_pixels - weight_background;
        if weight_foreground == 0 {
            break;
        }

        sum_background += t as f64 * count as f64;
        let mean_background = sum_background / weight_background as f64;
        let mean_foreground = (sum_total - sum_background) / weight_foreground as f64;

        let between_variance = weight_background as f64
            * weight_foreground as f64
            * (mean_background - mean_foreground).powi(2);

        if between_variance > max_variance {
            max_variance = between_variance;
            best_threshold = t as u8;
        }
    }

    best_threshold
}

// -- CLAHE helpers ------------------------------------------------------------

/// Pixel range `[start, end)` of tile `index` when `len` is split into `tiles`.
fn tile_span(index: u32, tiles: u32, len: u32) -> (u32, u32) {
    let start = (u64::from(index) * u64::from(len) / u64::from(tiles)) as u32;
    let end = (u64::from(index + 1) * u64::from(len) / u64::from(tiles)) as u32;
    (start, end)
}

/// Lower tile, upper tile, and blend weight for a fractional tile coordinate.
fn neighbour_tiles(position: f32, last: usize) -> (usize, usize, f32) {
    if position <= 0.0 {
        return (0, 0, 0.0);
    }
    let lower = (position.floor() as usize).min(last);
    if lower >= last {
        return (last, last, 0.0);
    }
    (lower, lower + 1, position - lower as f32)
}

/// Clip a tile histogram, redistribute the excess, and turn the result into
/// an equalization lookup table.
fn clipped_equalization(mut histogram: [u32; 256], area: u32, clip_limit: f32) -> [u8; 256] {
    let limit = ((clip_limit * area as f32 / 256.0).round() as u32).max(1);

    let mut excess = 0u32;
    for bin in histogram.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }
    let share = excess / 256;
    let remainder = (excess % 256) as usize;
    for (i, bin) in histogram.iter_mut().enumerate() {
        *bin += share + u32::from(i < remainder);
    }

    let mut lut = [0u8; 256];
    let mut cumulative = 0u64;
    let area = u64::from(area.max(1));
    for (i, &count) in histogram.iter().enumerate() {
        cumulative += u64::from(count);
        lut[i] = ((cumulative * 255 + area / 2) / area).min(255) as u8;
    }
    lut
}

// -- Tests --------------------------------------------------------------------
