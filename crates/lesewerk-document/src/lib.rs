// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// lesewerk-document — The multi-strategy recognition pipeline.
//
// Provides image processing (grayscale, upscale, unsharp mask, contrast
// stretch), the scanning stages (binarization, CLAHE, variant generation,
// OCR engine seam with a Tesseract driver, concurrent recognition runner,
// annotation), the rule-based text corrector and result selector, and the
// pipeline that ties them together.

pub mod image;
pub mod pipeline;
pub mod scan;
pub mod text;

// Re-export the primary structs so callers can use `lesewerk_document::OcrPipeline` etc.
pub use self::image::processor::ImageProcessor;
pub use self::image::source::SourceImage;
pub use pipeline::{OcrPipeline, PipelineOutcome};
pub use scan::annotate::Annotator;
pub use scan::enhance::ScanEnhancer;
pub use scan::ocr::{EngineOutput, TesseractConfig, TesseractEngine, TextRecognizer};
pub use scan::runner::RecognitionRunner;
pub use scan::variants::{Variant, VariantDiagnostic, VariantGenerator, VariantSet};
pub use text::correct::TextCorrector;
pub use text::select::ResultSelector;
