// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanning stages: binarization and contrast enhancement, variant
// generation, the OCR engine seam, the concurrent recognition runner, and
// result annotation.

pub mod annotate;
pub mod enhance;
pub mod ocr;
pub mod runner;
pub mod variants;

pub use annotate::{Annotation, Annotator};
pub use enhance::ScanEnhancer;
pub use ocr::{EngineOutput, TesseractConfig, TesseractEngine, TextRecognizer};
pub use runner::RecognitionRunner;
pub use variants::{Variant, VariantDiagnostic, VariantGenerator, VariantSet};

/// In-process engines for exercising the runner and pipeline without a
/// Tesseract installation.
#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use image::DynamicImage;
    use lesewerk_core::error::{LesewerkError, Result};
    use lesewerk_core::types::{BoxRect, OcrConfiguration, PageSegMode, WordBox};

    use super::ocr::{EngineOutput, TextRecognizer};

    /// What the scripted engine does for a given page-segmentation mode.
    #[derive(Debug, Clone)]
    pub enum Script {
        Text(&'static str, Option<f32>),
        Fail(&'static str),
        Unavailable,
        Sleep(Duration),
    }

    /// Answers by page-segmentation mode, counting calls and tracking peak
    /// concurrency. A call cancelled mid-sleep still leaves `active`.
    pub struct ScriptedEngine {
        script: Box<dyn Fn(PageSegMode) -> Script + Send + Sync>,
        pub calls: AtomicUsize,
        pub active: AtomicUsize,
        pub peak: AtomicUsize,
        pub seen: Mutex<Vec<(u32, u32, PageSegMode)>>,
    }

    impl ScriptedEngine {
        pub fn new(script: impl Fn(PageSegMode) -> Script + Send + Sync + 'static) -> Self {
            Self {
                script: Box::new(script),
                calls: AtomicUsize::new(0),
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }

        /// Same text with the same confidence for every configuration.
        pub fn constant(text: &'static str, confidence: Option<f32>) -> Self {
            Self::new(move |_| Script::Text(text, confidence))
        }
    }

    /// Decrements the in-flight count however the call ends.
    struct InFlight<'a>(&'a AtomicUsize);

    impl Drop for InFlight<'_> {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl TextRecognizer for ScriptedEngine {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn recognize(
            &self,
            image: &DynamicImage,
            configuration: &OcrConfiguration,
        ) -> Result<EngineOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            let _in_flight = InFlight(&self.active);
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.seen
                .lock()
                .unwrap()
                .push((image.width(), image.height(), configuration.psm));

            match (self.script)(configuration.psm) {
                Script::Text(text, confidence) => Ok(words_output(text, confidence)),
                Script::Fail(reason) => Err(LesewerkError::OcrError(reason.into())),
                Script::Unavailable => Err(LesewerkError::EngineUnavailable(
                    "scripted engine missing".into(),
                )),
                Script::Sleep(pause) => {
                    tokio::time::sleep(pause).await;
                    Ok(words_output("late", Some(90.0)))
                }
            }
        }
    }

    /// Lay `text` out as one row of word boxes, 10 px per character.
    pub fn words_output(text: &str, confidence: Option<f32>) -> EngineOutput {
        let mut x = 4;
        let words = text
            .split_whitespace()
            .map(|word| {
                let width = word.chars().count() as u32 * 10;
                let rect = BoxRect::new(x, 4, width, 14);
                x += width + 8;
                WordBox::new(word, rect, confidence)
            })
            .collect();
        EngineOutput {
            text: text.to_string(),
            words,
        }
    }
}
