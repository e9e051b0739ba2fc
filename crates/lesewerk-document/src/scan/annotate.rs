// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Annotator — draws the selected run's word boxes onto a copy of the image.

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use lesewerk_core::config::AnnotationSettings;
use lesewerk_core::error::{LesewerkError, Result};
use lesewerk_core::types::{BoxRect, WordBox};
use tracing::{debug, info, instrument};

const BOX_COLOUR: Rgb<u8> = Rgb([0, 255, 0]);
const LABEL_COLOUR: Rgb<u8> = Rgb([255, 0, 0]);
const BANNER_COLOUR: [u8; 3] = [200, 0, 0];
const BANNER_ALPHA: f32 = 0.6;

/// An annotated copy of the input and how many boxes ended up on it.
#[derive(Debug, Clone)]
pub struct Annotation {
    pub image: RgbImage,
    pub drawn: usize,
}

/// Draws word boxes (and optional labels) onto copies of an image.
pub struct Annotator {
    min_confidence: f32,
    thickness: u32,
    font: Option<FontVec>,
    label_max_chars: usize,
    label_px: f32,
}

impl Annotator {
    /// Build from settings, loading the label font if one is configured.
    pub fn new(settings: &AnnotationSettings) -> Result<Self> {
        let font = match &settings.label_font {
            Some(path) => {
                let bytes = std::fs::read(path).map_err(|err| {
                    LesewerkError::Config(format!(
                        "cannot read label font {}: {err}",
                        path.display()
                    ))
                })?;
                let font = FontVec::try_from_vec(bytes).map_err(|err| {
                    LesewerkError::Config(format!(
                        "invalid label font {}: {err}",
                        path.display()
                    ))
                })?;
                Some(font)
            }
            None => None,
        };

        Ok(Self {
            min_confidence: settings.min_confidence,
            thickness: settings.line_thickness.max(1),
            font,
            label_max_chars: settings.label_max_chars,
            label_px: settings.label_px,
        })
    }

    pub fn has_labels(&self) -> bool {
        self.font.is_some()
    }

    /// Draw every eligible box onto a copy of `image`.
    ///
    /// Degenerate boxes, boxes below the confidence floor, and boxes entirely
    /// outside the image are skipped. The rest are clipped to the image.
    #[instrument(skip_all, fields(width = image.width(), height = image.height(), words = words.len()))]
    pub fn annotate(&self, image: &RgbImage, words: &[WordBox]) -> Annotation {
        let mut canvas = image.clone();
        let mut drawn = 0;

        for word in words {
            if word.rect.is_degenerate() {
                continue;
            }
            if word
                .confidence
                .is_some_and(|conf| conf < self.min_confidence)
            {
                continue;
            }
            let Some(rect) = clip(word.rect, canvas.width(), canvas.height()) else {
                debug!(word = %word.text, "Box outside image, skipped");
                continue;
            };

            self.draw_box(&mut canvas, rect);
            if let Some(font) = &self.font {
                self.draw_label(&mut canvas, font, rect, &word.text);
            }
            drawn += 1;
        }

        info!(drawn, "Annotation complete");
        Annotation {
            image: canvas,
            drawn,
        }
    }

    fn draw_box(&self, canvas: &mut RgbImage, rect: BoxRect) {
        for inset in 0..self.thickness {
            let (Some(w), Some(h)) = (
                rect.width.checked_sub(inset * 2),
                rect.height.checked_sub(inset * 2),
            ) else {
                break;
            };
            if w == 0 || h == 0 {
                break;
            }
            let outline = Rect::at((rect.x + inset) as i32, (rect.y + inset) as i32).of_size(w, h);
            draw_hollow_rect_mut(canvas, outline, BOX_COLOUR);
        }
    }

    fn draw_label(&self, canvas: &mut RgbImage, font: &FontVec, rect: BoxRect, text: &str) {
        let label: String = text.chars().take(self.label_max_chars).collect();
        if label.is_empty() {
            return;
        }
        let y = (rect.y as f32 - self.label_px).max(0.0) as i32;
        draw_text_mut(
            canvas,
            LABEL_COLOUR,
            rect.x as i32,
            y,
            PxScale::from(self.label_px),
            font,
            &label,
        );
    }

    /// Copy of `image` with a translucent red banner across the top, used
    /// when no recognition result exists to annotate.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn fallback_banner(&self, image: &RgbImage, message: &str) -> RgbImage {
        let mut canvas = image.clone();
        let band = (canvas.height() / 10).max(24).min(canvas.height());

        for y in 0..band {
            for x in 0..canvas.width() {
                let pixel = canvas.get_pixel_mut(x, y);
                for (channel, &tint) in pixel.0.iter_mut().zip(BANNER_COLOUR.iter()) {
                    let blended = f32::from(*channel) * (1.0 - BANNER_ALPHA)
                        + f32::from(tint) * BANNER_ALPHA;
                    *channel = blended.round() as u8;
                }
            }
        }

        if let Some(font) = &self.font {
            let px = self.label_px.min(band as f32);
            let y = ((band as f32 - px) / 2.0).max(0.0) as i32;
            draw_text_mut(
                &mut canvas,
                Rgb([255, 255, 255]),
                8,
                y,
                PxScale::from(px),
                font,
                message,
            );
        }
        canvas
    }
}

/// Intersect `rect` with a `width` × `height` image.
fn clip(rect: BoxRect, width: u32, height: u32) -> Option<BoxRect> {
    if rect.x >= width || rect.y >= height {
        return None;
    }
    let right = rect.x.saturating_add(rect.width).min(width);
    let bottom = rect.y.saturating_add(rect.height).min(height);
    let clipped = BoxRect::new(rect.x, rect.y, right - rect.x, bottom - rect.y);
    (!clipped.is_degenerate()).then_some(clipped)
}
