// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR pipeline — source image to selected, corrected, annotated result.
//
//   SourceImage ─▶ VariantGenerator ─▶ RecognitionRunner ─▶ ResultSelector
//                                                              │
//                          Annotator ◀── winning run's boxes ──┘
//
// The pipeline owns no global state. Everything it needs (settings, engine
// handle, label font) is built once by the caller and passed in.

use std::path::Path;
use std::sync::Arc;

use image::RgbImage;
use lesewerk_core::config::PipelineConfig;
use lesewerk_core::error::{LesewerkError, Result};
use lesewerk_core::types::{FinalResult, RecognitionMode, RecognitionRun};
use tracing::{info, instrument, warn};

use crate::image::SourceImage;
use crate::scan::annotate::Annotator;
use crate::scan::ocr::{TesseractConfig, TesseractEngine, TextRecognizer};
use crate::scan::runner::RecognitionRunner;
use crate::scan::variants::{VariantGenerator, VariantSet};
use crate::text::correct::TextCorrector;
use crate::text::select::ResultSelector;

/// Everything one pipeline run produced.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub mode: RecognitionMode,
    pub result: FinalResult,
    /// Every recognition run, in generation order, scored on its corrected
    /// text.
    pub runs: Vec<RecognitionRun>,
    pub variants: VariantSet,
    /// Source image at the winning variant's scale, with boxes drawn.
    pub annotated: RgbImage,
    pub boxes_drawn: usize,
}

/// The multi-strategy recognition pipeline.
pub struct OcrPipeline {
    config: PipelineConfig,
    generator: VariantGenerator,
    runner: RecognitionRunner,
    selector: ResultSelector,
    annotator: Annotator,
}

impl OcrPipeline {
    /// Build a pipeline around an explicit engine.
    pub fn new(config: PipelineConfig, engine: Arc<dyn TextRecognizer>) -> Result<Self> {
        config.validate()?;
        let annotator = Annotator::new(&config.annotation)?;
        Ok(Self {
            generator: VariantGenerator::new(config.variants.clone()),
            runner: RecognitionRunner::new(engine, &config.runner),
            selector: ResultSelector::new(TextCorrector::new()),
            annotator,
            config,
        })
    }

    /// Build a pipeline driving the `tesseract` executable named in, or
    /// discovered from, the runner settings.
    pub fn with_tesseract(config: PipelineConfig) -> Result<Self> {
        let tesseract = TesseractConfig::from_settings(&config.runner)?;
        info!(executable = %tesseract.executable.display(), "Using Tesseract");
        Self::new(config, Arc::new(TesseractEngine::new(tesseract)))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn annotator(&self) -> &Annotator {
        &self.annotator
    }

    /// Load `path` and run the pipeline on it.
    pub async fn run_path(&self, path: impl AsRef<Path>) -> Result<PipelineOutcome> {
        let source = SourceImage::open(path)?;
        self.run(&source).await
    }

    /// Generate variants, recognise them all, select the best run, and
    /// annotate it.
    ///
    /// Fails with `NoVariants` when no strategy could be applied, with
    /// `Timeout` when every recognition run timed out, and with
    /// `EngineUnavailable` when every run failed otherwise. A run set with
    /// no text is not an error: the outcome carries `FinalResult::empty()`.
    #[instrument(skip_all, fields(mode = %self.config.mode, width = source.width(), height = source.height()))]
    pub async fn run(&self, source: &SourceImage) -> Result<PipelineOutcome> {
        let mode = self.config.mode;

        let variants = self.generator.generate(source, mode);
        if variants.is_empty() {
            warn!(diagnostics = variants.diagnostics.len(), "No variant survived");
            return Err(LesewerkError::NoVariants);
        }

        let configurations = self.config.configurations();
        let mut runs = self.runner.run(&variants.variants, &configurations).await?;
        let result = self.selector.select(&runs);
        // Report the scores selection compared, not the raw-text ones.
        for run in &mut runs {
            run.score = self.selector.rescore(run);
        }

        // Boxes are in the winning variant's pixel space.
        let (width, height) = result
            .winner
            .as_ref()
            .and_then(|winner| variants.get(winner.strategy))
            .map(|variant| variant.dimensions())
            .unwrap_or((source.width(), source.height()));
        let canvas = source.to_rgb_at(width, height);
        let annotation = self.annotator.annotate(&canvas, &result.words);

        info!(
            variants = variants.variants.len(),
            runs = runs.len(),
            empty = result.is_empty(),
            boxes = annotation.drawn,
            "Pipeline complete"
        );

        Ok(PipelineOutcome {
            mode,
            result,
            runs,
            variants,
            annotated: annotation.image,
            boxes_drawn: annotation.drawn,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::testing::{Script, ScriptedEngine};
    use image::{DynamicImage, GrayImage, Luma};
    use lesewerk_core::types::{PageSegMode, Strategy};

    const GLYPHS: [(char, [&str; 7]); 7] = [
        ('H', ["#...#", "#...#", "#...#", "#####", "#...#", "#...#", "#...#"]),
        ('E', ["#####", "#....", "#....", "####.", "#....", "#....", "#####"]),
        ('L', ["#....", "#....", "#....", "#....", "#....", "#....", "#####"]),
        ('O', [".###.", "#...#", "#...#", "#...#", "#...#", "#...#", ".###."]),
        ('W', ["#...#", "#...#", "#...#", "#.#.#", "#.#.#", "##.##", "#...#"]),
        ('R', ["####.", "#...#", "#...#", "####.", "#.#..", "#..#.", "#...#"]),
        ('D', ["####.", "#...#", "#...#", "#...#", "#...#", "#...#", "####."]),
    ];

    /// Black block letters on white, `cell` pixels per glyph dot.
    fn render(text: &str, cell: u32) -> SourceImage {
        let margin = cell * 4;
        let advance = cell * 7;
        let width = margin * 2 + advance * text.chars().count() as u32;
        let height = margin * 2 + cell * 7;
        let mut img = GrayImage::from_pixel(width, height, Luma([255]));

        for (i, ch) in text.chars().enumerate() {
            let Some((_, rows)) = GLYPHS.iter().find(|(g, _)| *g == ch) else {
                continue;
            };
            let left = margin + advance * i as u32;
            for (row, line) in rows.iter().enumerate() {
                for (col, dot) in line.chars().enumerate() {
                    if dot != '#' {
                        continue;
                    }
                    for dy in 0..cell {
                        for dx in 0..cell {
                            img.put_pixel(
                                left + col as u32 * cell + dx,
                                margin + row as u32 * cell + dy,
                                Luma([0]),
                            );
                        }
                    }
                }
            }
        }
        SourceImage::from_dynamic(DynamicImage::ImageLuma8(img))
    }

    fn config(mode: RecognitionMode) -> PipelineConfig {
        let mut config = PipelineConfig {
            mode,
            ..Default::default()
        };
        config.runner.max_concurrency = Some(2);
        config.runner.timeout_secs = 5;
        config
    }

    #[tokio::test]
    async fn standard_mode_with_scripted_engine() {
        let engine = Arc::new(ScriptedEngine::constant("HELLO WORLD", Some(95.0)));
        let pipeline = OcrPipeline::new(config(RecognitionMode::Standard), engine.clone()).unwrap();
        let source = render("HELLO WORLD", 4);

        let outcome = pipeline.run(&source).await.unwrap();

        assert_eq!(outcome.result.text, "HELLO WORLD");
        assert_eq!(outcome.result.stats.characters, 11);
        assert_eq!(outcome.result.stats.words, 2);
        assert_eq!(outcome.result.stats.lines, 1);
        assert_eq!(outcome.runs.len(), 1);
        assert_eq!(outcome.variants.strategies(), vec![Strategy::Otsu]);
        assert_eq!(outcome.result.words.len(), 2);
        assert_eq!(outcome.boxes_drawn, 2);
        assert_eq!(
            outcome.annotated.dimensions(),
            (source.width(), source.height())
        );
        let winner = outcome.result.winner.unwrap();
        assert_eq!(winner.configuration.psm, PageSegMode::SingleBlock);
        assert_eq!(winner.configuration.languages, "eng");
    }

    #[tokio::test]
    async fn enhanced_mode_annotates_at_the_winning_scale() {
        let engine = Arc::new(ScriptedEngine::new(|psm| match psm {
            PageSegMode::Automatic => Script::Text("Jawahan soai", Some(92.0)),
            _ => Script::Text("Jawahan soai", Some(70.0)),
        }));
        let pipeline = OcrPipeline::new(config(RecognitionMode::Enhanced), engine.clone()).unwrap();
        let source = render("HELLO", 2);

        let outcome = pipeline.run(&source).await.unwrap();

        assert_eq!(outcome.runs.len(), 15);
        assert_eq!(outcome.result.text, "Jawaban soal");
        let winner = outcome.result.winner.unwrap();
        assert_eq!(winner.index, 2);
        assert_eq!(winner.strategy, Strategy::Otsu);
        assert_eq!(winner.scale, 2);
        assert_eq!(
            outcome.annotated.dimensions(),
            (source.width() * 2, source.height() * 2)
        );
    }

    #[tokio::test]
    async fn run_scores_match_the_selected_score() {
        let engine = Arc::new(ScriptedEngine::constant("Unluk\u{1}", None));
        let pipeline = OcrPipeline::new(config(RecognitionMode::Standard), engine).unwrap();

        let outcome = pipeline.run(&render("LO", 3)).await.unwrap();

        assert_eq!(outcome.result.text, "Untuk");
        let winner = outcome.result.winner.unwrap();
        assert_eq!(winner.score.value, 5.0);
        assert_eq!(outcome.runs[0].score, winner.score);
    }

    #[tokio::test]
    async fn empty_recognition_is_not_an_error() {
        let engine = Arc::new(ScriptedEngine::constant("  \n\u{c}", None));
        let pipeline = OcrPipeline::new(config(RecognitionMode::Standard), engine).unwrap();
        let source = render("LO", 3);

        let outcome = pipeline.run(&source).await.unwrap();

        assert!(outcome.result.is_empty());
        assert_eq!(outcome.result.stats.characters, 0);
        assert_eq!(outcome.boxes_drawn, 0);
        assert_eq!(
            outcome.annotated.dimensions(),
            (source.width(), source.height())
        );
    }

    #[tokio::test]
    async fn unavailable_engine_is_fatal() {
        let engine = Arc::new(ScriptedEngine::new(|_| Script::Unavailable));
        let pipeline = OcrPipeline::new(config(RecognitionMode::Enhanced), engine).unwrap();
        let err = pipeline.run(&render("HE", 2)).await.unwrap_err();
        assert!(matches!(err, LesewerkError::EngineUnavailable(_)));
    }

    #[tokio::test]
    async fn nothing_to_recognise_is_no_variants() {
        let engine = Arc::new(ScriptedEngine::constant("x", None));
        let pipeline = OcrPipeline::new(config(RecognitionMode::Standard), engine.clone()).unwrap();
        let empty = SourceImage::from_dynamic(DynamicImage::ImageLuma8(GrayImage::new(0, 0)));
        let err = pipeline.run(&empty).await.unwrap_err();
        assert!(matches!(err, LesewerkError::NoVariants));
        assert_eq!(
            engine.calls.load(std::sync::atomic::Ordering::SeqCst),
            0
        );
    }

    #[tokio::test]
    async fn missing_input_is_input_not_found() {
        let engine = Arc::new(ScriptedEngine::constant("x", None));
        let pipeline = OcrPipeline::new(config(RecognitionMode::Standard), engine).unwrap();
        let err = pipeline
            .run_path("/nonexistent/scan.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, LesewerkError::InputNotFound(_)));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = config(RecognitionMode::Standard);
        config.runner.timeout_secs = 0;
        let engine = Arc::new(ScriptedEngine::constant("x", None));
        assert!(matches!(
            OcrPipeline::new(config, engine),
            Err(LesewerkError::Config(_))
        ));
    }

    #[tokio::test]
    #[ignore = "requires a tesseract installation"]
    async fn hello_world_with_real_tesseract() {
        let pipeline = OcrPipeline::with_tesseract(config(RecognitionMode::Standard)).unwrap();
        let outcome = pipeline.run(&render("HELLO WORLD", 8)).await.unwrap();

        let text = outcome.result.text.to_uppercase();
        assert!(text.contains("HELLO"), "recognised {text:?}");
        assert!(text.contains("WORLD"), "recognised {text:?}");
        assert!(outcome.result.words.len() >= 2);
    }
}
