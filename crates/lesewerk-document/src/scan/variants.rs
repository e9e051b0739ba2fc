// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Variant generation — turns one source image into the set of preprocessed
// representations handed to the OCR engine.

use image::{DynamicImage, GrayImage};
use lesewerk_core::config::VariantSettings;
use lesewerk_core::error::{LesewerkError, Result};
use lesewerk_core::types::{RecognitionMode, Strategy};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::enhance::ScanEnhancer;
use crate::image::{ImageProcessor, SourceImage};

/// One preprocessed representation of the source image.
#[derive(Debug, Clone)]
pub struct Variant {
    pub strategy: Strategy,
    /// Scale relative to the source image.
    pub scale: u32,
    pub image: GrayImage,
}

impl Variant {
    pub fn name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Owned copy in the form the OCR engine accepts.
    pub fn to_dynamic(&self) -> DynamicImage {
        DynamicImage::ImageLuma8(self.image.clone())
    }
}

/// A strategy (or the shared upscale step) that was skipped, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantDiagnostic {
    pub stage: String,
    pub reason: String,
}

/// Everything the generator produced for one image.
#[derive(Debug, Clone, Default)]
pub struct VariantSet {
    /// Successful variants, in generation order.
    pub variants: Vec<Variant>,
    /// Skipped strategies; never fatal on their own.
    pub diagnostics: Vec<VariantDiagnostic>,
}

impl VariantSet {
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn strategies(&self) -> Vec<Strategy> {
        self.variants.iter().map(|v| v.strategy).collect()
    }

    /// The variant produced by `strategy`, if it was generated.
    pub fn get(&self, strategy: Strategy) -> Option<&Variant> {
        self.variants.iter().find(|v| v.strategy == strategy)
    }
}

/// Produces the ordered variant set for a mode.
///
/// Generation is deterministic: the same image, mode, and settings always
/// yield the same strategies with the same parameters.
#[derive(Debug, Clone, Default)]
pub struct VariantGenerator {
    settings: VariantSettings,
}

impl VariantGenerator {
    pub fn new(settings: VariantSettings) -> Self {
        Self { settings }
    }

    /// Generate every strategy of `mode` from `source`.
    ///
    /// A strategy that fails is left out and recorded as a diagnostic; the
    /// remaining strategies are still produced.
    #[instrument(skip_all, fields(mode = %mode, width = source.width(), height = source.height()))]
    pub fn generate(&self, source: &SourceImage, mode: RecognitionMode) -> VariantSet {
        let mut set = VariantSet::default();
        let gray = source.to_gray();

        let (base, scale) = match mode {
            RecognitionMode::Standard => (gray, 1),
            RecognitionMode::Enhanced => self.enhanced_base(gray, &mut set.diagnostics),
        };

        for &strategy in Strategy::for_mode(mode) {
            match self.apply(strategy, &base) {
                Ok(image) => {
                    debug!(strategy = %strategy, scale, "Variant generated");
                    set.variants.push(Variant {
                        strategy,
                        scale,
                        image,
                    });
                }
                Err(err) => {
                    warn!(strategy = %strategy, error = %err, "Variant skipped");
                    set.diagnostics.push(VariantDiagnostic {
                        stage: strategy.name().into(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        info!(
            generated = set.variants.len(),
            skipped = set.diagnostics.len(),
            "Variant generation complete"
        );
        set
    }

    /// Upscale small pages, then unsharp-mask. Upscale failure falls back to
    /// the original resolution.
    fn enhanced_base(
        &self,
        gray: GrayImage,
        diagnostics: &mut Vec<VariantDiagnostic>,
    ) -> (GrayImage, u32) {
        let s = &self.settings;
        let shorter = gray.width().min(gray.height());
        let mut scale = 1;
        let mut base = gray;

        if shorter > 0 && shorter < s.upscale_below_px {
            match ImageProcessor::from_gray(base.clone()).upscale(s.upscale_factor, s.max_pixels) {
                Ok(upscaled) => {
                    base = upscaled.into_gray();
                    scale = s.upscale_factor;
                }
                Err(err) => {
                    warn!(error = %err, "Upscale skipped");
                    diagnostics.push(VariantDiagnostic {
                        stage: "upscale".into(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        if shorter == 0 {
            return (base, scale);
        }
        let sharpened = ImageProcessor::from_gray(base)
            .unsharpen(s.unsharp_sigma, s.unsharp_threshold)
            .into_gray();
        (sharpened, scale)
    }

    /// Run a single strategy against the shared grayscale base.
    pub fn apply(&self, strategy: Strategy, base: &GrayImage) -> Result<GrayImage> {
        let s = &self.settings;
        if base.width() == 0 || base.height() == 0 {
            return Err(LesewerkError::VariantGeneration {
                strategy: strategy.name().into(),
                reason: "image has no pixels".into(),
            });
        }

        let image = match strategy {
            Strategy::Otsu => {
                let blurred = ImageProcessor::from_gray(base.clone())
                    .gaussian_blur(s.blur_sigma)
                    .into_gray();
                ScanEnhancer::from_gray(blurred)
                    .binarize_otsu()
                    .open_close()
                    .into_gray()
            }
            Strategy::SharpenedGray => base.clone(),
            Strategy::ContrastStretch => ImageProcessor::from_gray(base.clone())
                .stretch_contrast(s.stretch_low_percentile, s.stretch_high_percentile)
                .into_gray(),
            Strategy::Adaptive => {
                if s.adaptive_radius == 0 {
                    return Err(LesewerkError::VariantGeneration {
                        strategy: strategy.name().into(),
                        reason: "adaptive radius must be positive".into(),
                    });
                }
                ScanEnhancer::from_gray(base.clone())
                    .binarize(s.adaptive_radius, s.adaptive_offset)
                    .into_gray()
            }
            Strategy::Clahe => ScanEnhancer::from_gray(base.clone())
                .equalize_clahe(s.clahe_tiles, s.clahe_clip_limit)?
                .into_gray(),
        };
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn page(width: u32, height: u32) -> SourceImage {
        let gray = GrayImage::from_fn(width, height, |x, y| {
            if (x / 4 + y / 6) % 3 == 0 {
                Luma([40])
            } else {
                Luma([210])
            }
        });
        SourceImage::from_dynamic(DynamicImage::ImageLuma8(gray))
    }

    #[test]
    fn standard_mode_yields_one_otsu_variant() {
        let set = VariantGenerator::default().generate(&page(60, 40), RecognitionMode::Standard);
        assert_eq!(set.strategies(), vec![Strategy::Otsu]);
        assert!(set.diagnostics.is_empty());
        let otsu = &set.variants[0];
        assert_eq!(otsu.scale, 1);
        assert_eq!(otsu.dimensions(), (60, 40));
        assert!(otsu.image.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn enhanced_mode_yields_all_strategies_upscaled() {
        let set = VariantGenerator::default().generate(&page(60, 40), RecognitionMode::Enhanced);
        assert_eq!(set.strategies(), Strategy::ENHANCED.to_vec());
        assert!(set.variants.iter().all(|v| v.scale == 2));
        assert!(set.variants.iter().all(|v| v.dimensions() == (120, 80)));
    }

    #[test]
    fn large_pages_are_not_upscaled() {
        let generator = VariantGenerator::new(VariantSettings {
            upscale_below_px: 32,
            ..Default::default()
        });
        let set = generator.generate(&page(60, 40), RecognitionMode::Enhanced);
        assert!(set.variants.iter().all(|v| v.scale == 1 && v.dimensions() == (60, 40)));
    }

    #[test]
    fn generation_is_deterministic() {
        let generator = VariantGenerator::default();
        let source = page(48, 36);
        let a = generator.generate(&source, RecognitionMode::Enhanced);
        let b = generator.generate(&source, RecognitionMode::Enhanced);
        assert_eq!(a.strategies(), b.strategies());
        for (left, right) in a.variants.iter().zip(&b.variants) {
            assert_eq!(left.image, right.image);
        }
    }

    #[test]
    fn failing_strategy_is_omitted_with_a_diagnostic() {
        // 6x6 upscales to 12x12, too small for an 8x8 CLAHE grid.
        let set = VariantGenerator::default().generate(&page(6, 6), RecognitionMode::Enhanced);
        assert_eq!(set.variants.len(), 4);
        assert!(set.get(Strategy::Clahe).is_none());
        assert_eq!(set.diagnostics.len(), 1);
        assert_eq!(set.diagnostics[0].stage, "clahe");
    }

    #[test]
    fn upscale_failure_falls_back_to_original_size() {
        let generator = VariantGenerator::new(VariantSettings {
            max_pixels: 100,
            ..Default::default()
        });
        let set = generator.generate(&page(40, 40), RecognitionMode::Enhanced);
        assert_eq!(set.diagnostics[0].stage, "upscale");
        assert_eq!(set.variants.len(), 5);
        assert!(set.variants.iter().all(|v| v.scale == 1));
    }

    #[test]
    fn empty_source_produces_no_variants() {
        let source = SourceImage::from_dynamic(DynamicImage::ImageLuma8(GrayImage::new(0, 0)));
        let set = VariantGenerator::default().generate(&source, RecognitionMode::Standard);
        assert!(set.is_empty());
        assert_eq!(set.diagnostics.len(), 1);
    }
}
