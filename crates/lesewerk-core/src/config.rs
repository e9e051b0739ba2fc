// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LesewerkError, Result};
use crate::types::{OcrConfiguration, PageSegMode, RecognitionMode, ScoreBasis};

/// Everything a single pipeline run needs, constructed once by the caller.
///
/// Every section falls back to its defaults, so a JSON file only has to name
/// the fields it changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub mode: RecognitionMode,
    pub variants: VariantSettings,
    pub runner: RunnerSettings,
    pub annotation: AnnotationSettings,
    pub output: OutputSettings,
}

impl PipelineConfig {
    /// Load a config from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject parameter combinations the image filters cannot handle.
    pub fn validate(&self) -> Result<()> {
        let v = &self.variants;
        if v.blur_sigma <= 0.0 || v.unsharp_sigma <= 0.0 {
            return Err(LesewerkError::Config(
                "blur and unsharp sigmas must be positive".into(),
            ));
        }
        if v.upscale_factor < 2 {
            return Err(LesewerkError::Config(format!(
                "upscale factor must be at least 2, got {}",
                v.upscale_factor
            )));
        }
        if v.clahe_tiles == 0 || v.clahe_clip_limit <= 0.0 {
            return Err(LesewerkError::Config(
                "CLAHE needs at least one tile and a positive clip limit".into(),
            ));
        }
        if !(0.0..0.5).contains(&v.stretch_low_percentile)
            || !(0.5..=1.0).contains(&v.stretch_high_percentile)
        {
            return Err(LesewerkError::Config(format!(
                "stretch percentiles out of range: {} / {}",
                v.stretch_low_percentile, v.stretch_high_percentile
            )));
        }
        if self.runner.timeout_secs == 0 {
            return Err(LesewerkError::Config("OCR timeout must be non-zero".into()));
        }
        if self.runner.max_concurrency == Some(0) {
            return Err(LesewerkError::Config(
                "worker pool needs at least one slot".into(),
            ));
        }
        if self.runner.standard_languages.trim().is_empty()
            || self.runner.enhanced_languages.trim().is_empty()
        {
            return Err(LesewerkError::Config("language set must not be empty".into()));
        }
        Ok(())
    }

    /// The OCR configurations tried for the configured mode.
    pub fn configurations(&self) -> Vec<OcrConfiguration> {
        self.runner.configurations(self.mode)
    }
}

/// Parameters of the variant generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VariantSettings {
    /// Enhanced mode upscales when the shorter side is below this.
    pub upscale_below_px: u32,
    pub upscale_factor: u32,
    /// Upscaling is skipped (with a diagnostic) past this pixel count.
    pub max_pixels: u64,
    /// Gaussian sigma applied before Otsu (≈ a 5×5 kernel).
    pub blur_sigma: f32,
    pub unsharp_sigma: f32,
    pub unsharp_threshold: i32,
    pub adaptive_radius: u32,
    pub adaptive_offset: i32,
    /// Tiles per axis.
    pub clahe_tiles: u32,
    pub clahe_clip_limit: f32,
    pub stretch_low_percentile: f32,
    pub stretch_high_percentile: f32,
}

impl Default for VariantSettings {
    fn default() -> Self {
        Self {
            upscale_below_px: 1500,
            upscale_factor: 2,
            max_pixels: 60_000_000,
            blur_sigma: 1.1,
            unsharp_sigma: 1.0,
            unsharp_threshold: 2,
            adaptive_radius: 15,
            adaptive_offset: 10,
            clahe_tiles: 8,
            clahe_clip_limit: 2.0,
            stretch_low_percentile: 0.01,
            stretch_high_percentile: 0.99,
        }
    }
}

/// Parameters of the recognition runner and the Tesseract driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSettings {
    pub standard_languages: String,
    pub enhanced_languages: String,
    /// Worker pool width; `None` uses the available parallelism.
    pub max_concurrency: Option<usize>,
    /// Per-invocation timeout.
    pub timeout_secs: u64,
    /// Explicit engine executable; discovered on `PATH` when unset.
    pub tesseract_path: Option<PathBuf>,
    pub tessdata_dir: Option<PathBuf>,
    /// OCR engine mode (`--oem`).
    pub oem: u8,
    /// How runs are scored. `character-count` ignores engine confidences.
    pub score_basis: ScoreBasis,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            standard_languages: "eng".into(),
            enhanced_languages: "eng+ind".into(),
            max_concurrency: None,
            timeout_secs: 120,
            tesseract_path: None,
            tessdata_dir: None,
            oem: 3,
            score_basis: ScoreBasis::ConfidenceWeighted,
        }
    }
}

impl RunnerSettings {
    /// Standard: one `psm 6` run. Enhanced: every page-segmentation mode with
    /// the dual-language set.
    pub fn configurations(&self, mode: RecognitionMode) -> Vec<OcrConfiguration> {
        match mode {
            RecognitionMode::Standard => vec![
                OcrConfiguration::new(PageSegMode::SingleBlock, self.standard_languages.clone())
                    .with_score_basis(self.score_basis),
            ],
            RecognitionMode::Enhanced => PageSegMode::ENHANCED
                .iter()
                .map(|&psm| {
                    OcrConfiguration::new(psm, self.enhanced_languages.clone())
                        .with_score_basis(self.score_basis)
                })
                .collect(),
        }
    }

    /// Effective worker pool width.
    pub fn concurrency(&self) -> usize {
        self.max_concurrency
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
            .max(1)
    }
}

/// How the annotated image is drawn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationSettings {
    /// Words below this confidence are not boxed. Words without a confidence
    /// are always boxed.
    pub min_confidence: f32,
    pub line_thickness: u32,
    /// TrueType font for word labels; labels are skipped when unset.
    pub label_font: Option<PathBuf>,
    pub label_max_chars: usize,
    pub label_px: f32,
}

impl Default for AnnotationSettings {
    fn default() -> Self {
        Self {
            min_confidence: 60.0,
            line_thickness: 2,
            label_font: None,
            label_max_chars: 25,
            label_px: 16.0,
        }
    }
}

/// Where result artifacts are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub dir: PathBuf,
    pub text_file: String,
    pub annotated_file: String,
    pub report_file: String,
    /// Write one PNG per variant in enhanced mode.
    pub debug_variants: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            text_file: "hasil_teks.txt".into(),
            annotated_file: "hasil_deteksi.jpg".into(),
            report_file: "hasil_laporan.json".into(),
            debug_variants: true,
        }
    }
}
