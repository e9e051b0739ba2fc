// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Result artifacts on disk: corrected text, annotated JPEG, per-variant
// debug PNGs, and the JSON run report.

use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbImage};
use lesewerk_core::LesewerkError;
use lesewerk_core::config::OutputSettings;
use lesewerk_core::error::Result;
use lesewerk_document::VariantSet;
use tracing::{debug, info};

use super::report::RunReport;

/// Writes artifacts into the configured output directory.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    settings: OutputSettings,
}

impl ArtifactWriter {
    /// Create the output directory if needed.
    pub fn new(settings: &OutputSettings) -> Result<Self> {
        std::fs::create_dir_all(&settings.dir)?;
        Ok(Self {
            settings: settings.clone(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.settings.dir
    }

    /// Corrected text, exactly as selected (empty when nothing was found).
    pub fn write_text(&self, text: &str) -> Result<PathBuf> {
        let path = self.settings.dir.join(&self.settings.text_file);
        let mut contents = text.to_string();
        if !contents.is_empty() {
            contents.push('\n');
        }
        std::fs::write(&path, contents)?;
        debug!(path = %path.display(), "Text written");
        Ok(path)
    }

    /// Annotated (or banner) image as JPEG.
    pub fn write_annotated(&self, image: &RgbImage) -> Result<PathBuf> {
        let path = self.settings.dir.join(&self.settings.annotated_file);
        image
            .save_with_format(&path, ImageFormat::Jpeg)
            .map_err(|err| LesewerkError::ImageError(format!("JPEG encode failed: {err}")))?;
        debug!(path = %path.display(), "Annotated image written");
        Ok(path)
    }

    /// One `variant_<n>_<name>.png` per generated variant, numbered from 1.
    pub fn write_variants(&self, variants: &VariantSet) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(variants.variants.len());
        for (idx, variant) in variants.variants.iter().enumerate() {
            let path = self
                .settings
                .dir
                .join(format!("variant_{}_{}.png", idx + 1, variant.name()));
            variant
                .image
                .save_with_format(&path, ImageFormat::Png)
                .map_err(|err| LesewerkError::ImageError(format!("PNG encode failed: {err}")))?;
            written.push(path);
        }
        info!(count = written.len(), "Variant images written");
        Ok(written)
    }

    /// Pretty-printed JSON report.
    pub fn write_report(&self, report: &RunReport) -> Result<PathBuf> {
        let path = self.settings.dir.join(&self.settings.report_file);
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(&path, json)?;
        debug!(path = %path.display(), "Report written");
        Ok(path)
    }
}
