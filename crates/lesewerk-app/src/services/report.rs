// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Run reports: the JSON summary written next to the artifacts and the
// plain-text report printed to stdout.

use std::fmt::Write as _;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use lesewerk_core::{RecognitionMode, RunSummary, ScoreBasis, Strategy, TextStats};
use lesewerk_document::{PipelineOutcome, VariantDiagnostic};
use serde::Serialize;

/// One recognition run as it appears in the JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct RunLine {
    pub index: usize,
    pub strategy: Strategy,
    pub scale: u32,
    pub configuration: String,
    pub basis: ScoreBasis,
    /// Score on the corrected text; the winner's line matches `winner.score`.
    pub score: f64,
    /// Non-whitespace characters in the engine's raw text.
    pub characters: usize,
    pub failure: Option<String>,
}

/// Machine-readable summary of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub input: PathBuf,
    pub mode: RecognitionMode,
    pub text_recognized: bool,
    pub stats: TextStats,
    pub winner: Option<RunSummary>,
    pub boxes_drawn: usize,
    pub runs: Vec<RunLine>,
    pub diagnostics: Vec<VariantDiagnostic>,
    pub artifacts: Vec<PathBuf>,
}

impl RunReport {
    pub fn new(input: PathBuf, outcome: &PipelineOutcome) -> Self {
        let runs = outcome
            .runs
            .iter()
            .map(|run| RunLine {
                index: run.index,
                strategy: run.strategy,
                scale: run.scale,
                configuration: run.configuration.to_string(),
                basis: run.score.basis,
                score: run.score.value,
                characters: run.text.chars().filter(|c| !c.is_whitespace()).count(),
                failure: run.failure.clone(),
            })
            .collect();

        Self {
            generated_at: Utc::now(),
            input,
            mode: outcome.mode,
            text_recognized: !outcome.result.is_empty(),
            stats: outcome.result.stats,
            winner: outcome.result.winner.clone(),
            boxes_drawn: outcome.boxes_drawn,
            runs,
            diagnostics: outcome.variants.diagnostics.clone(),
            artifacts: Vec::new(),
        }
    }
}

/// Marker printed in place of text when no run produced any.
pub const NO_TEXT_MARKER: &str = "(no text recognized)";

/// The terminal report: recognised text, then counts.
pub fn render_terminal(outcome: &PipelineOutcome) -> String {
    let result = &outcome.result;
    let mut out = String::new();

    let _ = writeln!(out, "=== Recognized text ({} mode) ===", outcome.mode);
    if result.is_empty() {
        let _ = writeln!(out, "{NO_TEXT_MARKER}");
    } else {
        let _ = writeln!(out, "{}", result.text);
    }
    let _ = writeln!(out, "================================");
    let _ = writeln!(out, "Characters : {}", result.stats.characters);
    let _ = writeln!(out, "Lines      : {}", result.stats.lines);
    let _ = writeln!(out, "Words      : {}", result.stats.words);

    if let Some(winner) = &result.winner {
        let _ = writeln!(
            out,
            "Best run   : {} x{} {} (score {:.1})",
            winner.strategy, winner.scale, winner.configuration, winner.score.value
        );
    }
    let failed = outcome.runs.iter().filter(|run| !run.succeeded()).count();
    if failed > 0 {
        let _ = writeln!(out, "Failed runs: {failed} of {}", outcome.runs.len());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, RgbImage};
    use lesewerk_core::{
        BoxRect, FinalResult, OcrConfiguration, PageSegMode, QualityScore, RecognitionRun,
        WordBox,
    };
    use lesewerk_document::{Variant, VariantSet};

    fn outcome(text: &str) -> PipelineOutcome {
        let configuration = OcrConfiguration::new(PageSegMode::SingleBlock, "eng");
        let words = vec![WordBox::new("HELLO", BoxRect::new(1, 1, 10, 5), Some(90.0))];
        let run = RecognitionRun {
            index: 0,
            strategy: Strategy::Otsu,
            scale: 1,
            score: QualityScore::assess(configuration.score_basis, text, &words),
            configuration: configuration.clone(),
            text: text.into(),
            words,
            failure: None,
        };
        let failed = RecognitionRun::failed(1, Strategy::Otsu, 1, configuration, "timed out");
        let result = if text.trim().is_empty() {
            FinalResult::empty()
        } else {
            FinalResult::from_run(&run, text.into())
        };
        PipelineOutcome {
            mode: RecognitionMode::Standard,
            result,
            runs: vec![run, failed],
            variants: VariantSet {
                variants: vec![Variant {
                    strategy: Strategy::Otsu,
                    scale: 1,
                    image: GrayImage::new(4, 4),
                }],
                diagnostics: vec![VariantDiagnostic {
                    stage: "clahe".into(),
                    reason: "too small".into(),
                }],
            },
            annotated: RgbImage::new(4, 4),
            boxes_drawn: 1,
        }
    }

    #[test]
    fn terminal_report_shows_text_and_counts() {
        let report = render_terminal(&outcome("HELLO WORLD"));
        assert!(report.contains("HELLO WORLD"));
        assert!(report.contains("Characters : 11"));
        assert!(report.contains("Words      : 2"));
        assert!(report.contains("Best run   : otsu x1 psm6/eng"));
        assert!(report.contains("Failed runs: 1 of 2"));
    }

    #[test]
    fn terminal_report_marks_empty_results() {
        let report = render_terminal(&outcome(""));
        assert!(report.contains(NO_TEXT_MARKER));
        assert!(report.contains("Characters : 0"));
        assert!(!report.contains("Best run"));
    }

    #[test]
    fn json_report_lists_runs_and_diagnostics() {
        let report = RunReport::new(PathBuf::from("scan.jpg"), &outcome("HELLO"));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["mode"], "standard");
        assert_eq!(json["text_recognized"], true);
        assert_eq!(json["runs"].as_array().unwrap().len(), 2);
        assert_eq!(json["runs"][1]["failure"], "timed out");
        assert_eq!(json["diagnostics"][0]["stage"], "clahe");
        assert_eq!(json["winner"]["strategy"], "otsu");
        assert_eq!(json["runs"][0]["score"], json["winner"]["score"]["value"]);
    }
}
