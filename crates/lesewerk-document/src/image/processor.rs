// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — upscale, unsharp mask, Gaussian blur, and histogram
// stretch on grayscale images, using the `image` and `imageproc` crates.

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::gaussian_blur_f32;
use lesewerk_core::error::{LesewerkError, Result};
use tracing::{debug, info, instrument};

/// Grayscale processing pipeline operating on a single in-memory image.
///
/// Operations consume `self` and return a new `ImageProcessor` wrapping the
/// transformed image, enabling method chaining:
///
/// ```ignore
/// let base = ImageProcessor::from_dynamic(&photo)
///     .upscale(2, 60_000_000)?
///     .unsharpen(1.0, 2)
///     .into_gray();
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: GrayImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Convert any decoded image to luma and wrap it.
    pub fn from_dynamic(image: &DynamicImage) -> Self {
        Self {
            image: image.to_luma8(),
        }
    }

    /// Wrap an existing grayscale buffer.
    pub fn from_gray(image: GrayImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.image
    }

    pub fn into_gray(self) -> GrayImage {
        self.image
    }

    // -- Transformations ------------------------------------------------------

    /// Enlarge by an integer `factor` with Lanczos3, which keeps stroke edges
    /// crisp.
    ///
    /// Fails when the result would exceed `max_pixels` or overflow `u32`.
    #[instrument(skip(self), fields(factor, max_pixels))]
    pub fn upscale(self, factor: u32, max_pixels: u64) -> Result<Self> {
        let (w, h) = self.image.dimensions();
        let (new_w, new_h) = match (w.checked_mul(factor), h.checked_mul(factor)) {
            (Some(nw), Some(nh)) => (nw, nh),
            _ => {
                return Err(LesewerkError::ImageError(format!(
                    "upscaling {w}x{h} by {factor} overflows"
                )));
            }
        };
        let pixels = u64::from(new_w) * u64::from(new_h);
        if pixels > max_pixels {
            return Err(LesewerkError::ImageError(format!(
                "upscaled size {new_w}x{new_h} exceeds the {max_pixels} pixel limit"
            )));
        }

        info!(from_w = w, from_h = h, new_w, new_h, "Upscaling image");
        let resized = image::imageops::resize(&self.image, new_w, new_h, FilterType::Lanczos3);
        Ok(Self { image: resized })
    }

    /// Unsharp mask: add back the difference to a Gaussian-blurred copy where
    /// it exceeds `threshold`.
    #[instrument(skip(self), fields(sigma, threshold))]
    pub fn unsharpen(self, sigma: f32, threshold: i32) -> Self {
        debug!(sigma, threshold, "Applying unsharp mask");
        Self {
            image: image::imageops::unsharpen(&self.image, sigma, threshold),
        }
    }

    /// Gaussian blur, used to calm sensor noise before global thresholding.
    #[instrument(skip(self), fields(sigma))]
    pub fn gaussian_blur(self, sigma: f32) -> Self {
        debug!(sigma, "Applying Gaussian blur");
        Self {
            image: gaussian_blur_f32(&self.image, sigma),
        }
    }

    /// Global histogram stretch between the `low` and `high` percentiles
    /// (fractions in `0..=1`).
    ///
    /// Values at or below the low percentile map to 0, at or above the high
    /// percentile to 255, linearly in between. A flat image is returned
    /// unchanged.
    #[instrument(skip(self), fields(low, high))]
    pub fn stretch_contrast(self, low: f32, high: f32) -> Self {
        let mut histogram = [0u64; 256];
        for pixel in self.image.pixels() {
            histogram[pixel.0[0] as usize] += 1;
        }

        let total = u64::from(self.image.width()) * u64::from(self.image.height());
        if total == 0 {
            return self;
        }

        let lo = percentile_level(&histogram, total, low);
        let hi = percentile_level(&histogram, total, high);
        if hi <= lo {
            debug!(lo, hi, "Flat histogram, contrast stretch skipped");
            return self;
        }
        info!(lo, hi, "Stretching contrast");

        let span = f32::from(hi - lo);
        let mut lut = [0u8; 256];
        for (value, slot) in lut.iter_mut().enumerate() {
            let v = value as f32;
            *slot = (((v - f32::from(lo)) * 255.0 / span).round()).clamp(0.0, 255.0) as u8;
        }

        let mut image = self.image;
        for pixel in image.pixels_mut() {
            *pixel = Luma([lut[pixel.0[0] as usize]]);
        }
        Self { image }
    }
}

/// Smallest gray level whose cumulative share reaches `fraction`.
fn percentile_level(histogram: &[u64; 256], total: u64, fraction: f32) -> u8 {
    let target = (total as f64 * f64::from(fraction.clamp(0.0, 1.0))).ceil().max(1.0) as u64;
    let mut cumulative = 0u64;
    for (level, &count) in histogram.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return level as u8;
        }
    }
    255
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32, lo: u8, hi: u8) -> GrayImage {
        GrayImage::from_fn(width, height, |x, _| {
            let t = x as f32 / (width - 1).max(1) as f32;
            Luma([(f32::from(lo) + t * f32::from(hi - lo)).round() as u8])
        })
    }

    #[test]
    fn upscale_doubles_dimensions() {
        let out = ImageProcessor::from_gray(GrayImage::new(30, 20))
            .upscale(2, 10_000)
            .unwrap();
        assert_eq!((out.width(), out.height()), (60, 40));
    }

    #[test]
    fn upscale_respects_pixel_limit() {
        let err = ImageProcessor::from_gray(GrayImage::new(100, 100))
            .upscale(2, 1_000)
            .err()
            .unwrap();
        assert!(matches!(err, LesewerkError::ImageError(_)));
    }

    #[test]
    fn stretch_expands_a_narrow_range() {
        let out = ImageProcessor::from_gray(gradient(101, 4, 100, 150))
            .stretch_contrast(0.01, 0.99)
            .into_gray();
        let min = out.pixels().map(|p| p.0[0]).min().unwrap();
        let max = out.pixels().map(|p| p.0[0]).max().unwrap();
        assert_eq!(min, 0);
        assert_eq!(max, 255);
    }

    #[test]
    fn stretch_leaves_flat_images_alone() {
        let flat = GrayImage::from_pixel(10, 10, Luma([77]));
        let out = ImageProcessor::from_gray(flat.clone())
            .stretch_contrast(0.01, 0.99)
            .into_gray();
        assert_eq!(out, flat);
    }

    #[test]
    fn unsharpen_and_blur_keep_dimensions() {
        let out = ImageProcessor::from_gray(gradient(40, 30, 0, 255))
            .gaussian_blur(1.1)
            .unsharpen(1.0, 2)
            .into_gray();
        assert_eq!(out.dimensions(), (40, 30));
    }
}
