// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The decoded input image, loaded once per pipeline run.

use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, RgbImage};
use lesewerk_core::error::{LesewerkError, Result};
use tracing::{info, instrument};

/// Immutable source pixels for one recognition request.
#[derive(Debug, Clone)]
pub struct SourceImage {
    image: DynamicImage,
    path: Option<PathBuf>,
}

impl SourceImage {
    /// Decode an image file.
    ///
    /// A path that is not a file, or a file that does not decode, is
    /// [`LesewerkError::InputNotFound`].
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(LesewerkError::InputNotFound(format!(
                "{} is not a file",
                path.display()
            )));
        }
        let image = image::open(path).map_err(|err| {
            LesewerkError::InputNotFound(format!(
                "failed to decode {}: {}",
                path.display(),
                err
            ))
        })?;
        info!(
            width = image.width(),
            height = image.height(),
            channels = image.color().channel_count(),
            "Source image loaded"
        );
        Ok(Self {
            image,
            path: Some(path.to_path_buf()),
        })
    }

    /// Wrap an already-decoded image.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image, path: None }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn channels(&self) -> u8 {
        self.image.color().channel_count()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    /// Luma conversion shared by every preprocessing strategy.
    pub fn to_gray(&self) -> GrayImage {
        self.image.to_luma8()
    }

    /// RGB copy sized to `width` x `height`, used as the annotation canvas
    /// for a variant of those dimensions.
    pub fn to_rgb_at(&self, width: u32, height: u32) -> RgbImage {
        let rgb = self.image.to_rgb8();
        if rgb.dimensions() == (width, height) {
            rgb
        } else {
            image::imageops::resize(&rgb, width, height, FilterType::Lanczos3)
        }
    }
}
