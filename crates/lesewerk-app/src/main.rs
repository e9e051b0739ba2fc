// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Lesewerk: multi-strategy OCR for low-quality document photos.
//
// Entry point. Parses arguments, initialises logging, runs the pipeline on one
// image, writes the artifacts, and prints the report.
//
// Exit codes: 0 on success (including "no text recognized"), 1 when the input
// or configuration is unusable, 2 when the OCR engine is unavailable.

mod services;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use lesewerk_core::human_errors::{Severity, humanize_error};
use lesewerk_core::{LesewerkError, PipelineConfig, RecognitionMode};
use lesewerk_document::{Annotator, OcrPipeline, SourceImage};

use services::output::ArtifactWriter;
use services::report::{RunReport, render_terminal};

/// Extract text from a photographed or scanned document.
#[derive(Debug, Parser)]
#[command(name = "lesewerk", version, about)]
struct Args {
    /// Image to recognise; prompted for when omitted.
    input: Option<PathBuf>,

    /// `standard` (one variant, one configuration) or `enhanced`.
    #[arg(short, long)]
    mode: Option<RecognitionMode>,

    /// Directory the result files are written to.
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// JSON pipeline configuration; flags override its fields.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the tesseract executable (default: search PATH).
    #[arg(long)]
    tesseract: Option<PathBuf>,

    /// Directory holding the *.traineddata language files.
    #[arg(long)]
    tessdata_dir: Option<PathBuf>,

    /// TrueType font used to label word boxes and the fallback banner.
    /// Without it, boxes and the banner are drawn unlabelled.
    #[arg(long)]
    font: Option<PathBuf>,

    /// Per-invocation OCR timeout in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Concurrent OCR invocations (default: available parallelism).
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Skip the per-variant PNGs in enhanced mode.
    #[arg(long)]
    no_debug_images: bool,
}

impl Args {
    /// Load the config file (if any) and apply flag overrides.
    fn pipeline_config(&self) -> Result<PipelineConfig, LesewerkError> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(dir) = &self.output_dir {
            config.output.dir = dir.clone();
        }
        if let Some(path) = &self.tesseract {
            config.runner.tesseract_path = Some(path.clone());
        }
        if let Some(dir) = &self.tessdata_dir {
            config.runner.tessdata_dir = Some(dir.clone());
        }
        if let Some(font) = &self.font {
            config.annotation.label_font = Some(font.clone());
        }
        if let Some(secs) = self.timeout_secs {
            config.runner.timeout_secs = secs;
        }
        if let Some(jobs) = self.jobs {
            config.runner.max_concurrency = Some(jobs);
        }
        if self.no_debug_images {
            config.output.debug_variants = false;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so stdout carries only the report.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Lesewerk starting");

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "Recognition failed");
            let human = humanize_error(&err);
            let prefix = match human.severity {
                Severity::Transient => "Temporary problem",
                Severity::ActionRequired => "Action needed",
                Severity::Permanent => "Error",
            };
            eprintln!("{prefix}: {}", human.message);
            eprintln!("  {}", human.suggestion);
            ExitCode::from(exit_code(&err))
        }
    }
}

async fn run(args: &Args) -> Result<(), LesewerkError> {
    let config = args.pipeline_config()?;

    let input = match &args.input {
        Some(path) => path.clone(),
        None => prompt_for_path(&mut io::stdin().lock(), &mut io::stdout())?,
    };
    // Fatal before anything is written.
    let source = SourceImage::open(&input)?;

    let pipeline = match OcrPipeline::with_tesseract(config.clone()) {
        Ok(pipeline) => pipeline,
        Err(err @ LesewerkError::EngineUnavailable(_)) => {
            write_fallback(&config, &source, &err);
            return Err(err);
        }
        Err(err) => return Err(err),
    };

    let outcome = match pipeline.run(&source).await {
        Ok(outcome) => outcome,
        Err(err @ LesewerkError::EngineUnavailable(_)) => {
            write_fallback(&config, &source, &err);
            return Err(err);
        }
        Err(err) => return Err(err),
    };

    let writer = ArtifactWriter::new(&config.output)?;
    let mut report = RunReport::new(input, &outcome);
    report
        .artifacts
        .push(writer.write_text(&outcome.result.text)?);
    report
        .artifacts
        .push(writer.write_annotated(&outcome.annotated)?);
    if outcome.mode == RecognitionMode::Enhanced && config.output.debug_variants {
        report
            .artifacts
            .extend(writer.write_variants(&outcome.variants)?);
    }
    let report_path = writer.write_report(&report)?;
    tracing::info!(
        report = %report_path.display(),
        artifacts = report.artifacts.len(),
        "Artifacts written"
    );

    print!("{}", render_terminal(&outcome));
    Ok(())
}

/// Message carried by the fallback banner, and printed alongside it.
const FALLBACK_NOTICE: &str = "Fallback: Tesseract unavailable, OCR skipped";

/// Best effort: the source image with a red banner in place of boxes.
fn write_fallback(config: &PipelineConfig, source: &SourceImage, err: &LesewerkError) {
    match fallback_image(config, source, err) {
        Ok(path) => {
            tracing::warn!(path = %path.display(), "Wrote fallback image");
            // The banner is blank without a label font.
            println!("{}", fallback_line(&path));
        }
        Err(write_err) => tracing::warn!(error = %write_err, "Fallback image not written"),
    }
}

fn fallback_image(
    config: &PipelineConfig,
    source: &SourceImage,
    err: &LesewerkError,
) -> Result<PathBuf, LesewerkError> {
    let annotator = Annotator::new(&config.annotation)
        .or_else(|_| Annotator::new(&Default::default()))?;
    let banner = annotator.fallback_banner(
        &source.to_rgb_at(source.width(), source.height()),
        &format!("{FALLBACK_NOTICE} ({err})"),
    );
    ArtifactWriter::new(&config.output)?.write_annotated(&banner)
}

fn fallback_line(path: &Path) -> String {
    format!("{FALLBACK_NOTICE}. Image written to {}", path.display())
}

/// Ask for an image path on `output`, read one line from `input`.
fn prompt_for_path(input: &mut impl BufRead, output: &mut impl Write) -> io::Result<PathBuf> {
    write!(output, "Image path: ")?;
    output.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(PathBuf::from(strip_quotes(&line)))
}

/// Trim whitespace and one pair of surrounding quotes, as left by drag-and-drop
/// into a terminal.
fn strip_quotes(raw: &str) -> &str {
    let trimmed = raw.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = trimmed
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner.trim();
        }
    }
    trimmed
}

fn exit_code(err: &LesewerkError) -> u8 {
    match err {
        LesewerkError::EngineUnavailable(_) => 2,
        _ => 1,
    }
}
