// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Lesewerk recognition pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LesewerkError;

/// How much effort the pipeline spends on a single image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecognitionMode {
    /// One Otsu variant, one OCR configuration.
    #[default]
    Standard,
    /// Every preprocessing strategy under every page-segmentation mode.
    Enhanced,
}

impl fmt::Display for RecognitionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => f.write_str("standard"),
            Self::Enhanced => f.write_str("enhanced"),
        }
    }
}

impl FromStr for RecognitionMode {
    type Err = LesewerkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "enhanced" => Ok(Self::Enhanced),
            other => Err(LesewerkError::Config(format!(
                "unknown mode `{other}` (expected `standard` or `enhanced`)"
            ))),
        }
    }
}

/// A preprocessing strategy the variant generator knows how to apply.
///
/// The declaration order is the generation order in enhanced mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Gaussian blur, Otsu global threshold, then open/close cleanup.
    Otsu,
    /// The (possibly upscaled) unsharp-masked grayscale base itself.
    SharpenedGray,
    /// Global percentile histogram stretch.
    ContrastStretch,
    /// Local-mean (integral image) thresholding.
    Adaptive,
    /// Contrast-limited adaptive histogram equalization.
    Clahe,
}

impl Strategy {
    /// Strategies generated in enhanced mode, in generation order.
    pub const ENHANCED: [Strategy; 5] = [
        Strategy::Otsu,
        Strategy::SharpenedGray,
        Strategy::ContrastStretch,
        Strategy::Adaptive,
        Strategy::Clahe,
    ];

    /// Strategies generated in standard mode.
    pub const STANDARD: [Strategy; 1] = [Strategy::Otsu];

    /// The strategies used by `mode`, in generation order.
    pub fn for_mode(mode: RecognitionMode) -> &'static [Strategy] {
        match mode {
            RecognitionMode::Standard => &Self::STANDARD,
            RecognitionMode::Enhanced => &Self::ENHANCED,
        }
    }

    /// Stable identifier used in file names and reports.
    pub fn name(self) -> &'static str {
        match self {
            Self::Otsu => "otsu",
            Self::SharpenedGray => "sharpened-gray",
            Self::ContrastStretch => "contrast-stretch",
            Self::Adaptive => "adaptive",
            Self::Clahe => "clahe",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tesseract page-segmentation modes the pipeline tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageSegMode {
    /// `--psm 3`: fully automatic page segmentation.
    Automatic,
    /// `--psm 4`: a single column of text of variable sizes.
    SingleColumn,
    /// `--psm 6`: a single uniform block of text.
    SingleBlock,
}

impl PageSegMode {
    /// Modes tried in enhanced mode, most structured first.
    pub const ENHANCED: [PageSegMode; 3] = [
        PageSegMode::SingleBlock,
        PageSegMode::SingleColumn,
        PageSegMode::Automatic,
    ];

    /// Numeric value passed to `--psm`.
    pub fn code(self) -> u8 {
        match self {
            Self::Automatic => 3,
            Self::SingleColumn => 4,
            Self::SingleBlock => 6,
        }
    }
}

/// How a run's quality score was computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoreBasis {
    /// Sum over words of `chars × confidence / 100`.
    ConfidenceWeighted,
    /// Count of non-whitespace characters.
    CharacterCount,
}

/// One page-segmentation mode + language-set pair handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OcrConfiguration {
    pub psm: PageSegMode,
    /// Tesseract language string, e.g. `eng` or `eng+ind`.
    pub languages: String,
    /// Basis the resulting run is scored on.
    pub score_basis: ScoreBasis,
}

impl OcrConfiguration {
    pub fn new(psm: PageSegMode, languages: impl Into<String>) -> Self {
        Self {
            psm,
            languages: languages.into(),
            score_basis: ScoreBasis::ConfidenceWeighted,
        }
    }

    pub fn with_score_basis(mut self, basis: ScoreBasis) -> Self {
        self.score_basis = basis;
        self
    }
}

impl fmt::Display for OcrConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "psm{}/{}", self.psm.code(), self.languages)
    }
}

/// Axis-aligned rectangle in the pixel space of the variant it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoxRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoxRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Zero width or zero height.
    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A recognised word and where it sits in the variant image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordBox {
    pub text: String,
    pub rect: BoxRect,
    /// Engine-reported confidence in `0..=100`, when the engine has one.
    pub confidence: Option<f32>,
}

impl WordBox {
    pub fn new(text: impl Into<String>, rect: BoxRect, confidence: Option<f32>) -> Self {
        Self {
            text: text.into(),
            rect,
            confidence,
        }
    }
}

/// Scalar quality of one recognition run, tagged with how it was computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    pub basis: ScoreBasis,
    pub value: f64,
}

impl QualityScore {
    /// Score given to failed or empty runs.
    pub fn zero() -> Self {
        Self {
            basis: ScoreBasis::CharacterCount,
            value: 0.0,
        }
    }

    /// Score a run's output on the `preferred` basis.
    ///
    /// `ConfidenceWeighted` falls back to `CharacterCount` when no word carries
    /// a confidence, so a run is never scored on a basis it has no data for.
    pub fn assess(preferred: ScoreBasis, text: &str, words: &[WordBox]) -> Self {
        if preferred == ScoreBasis::ConfidenceWeighted {
            let mut confident = 0usize;
            let mut value = 0.0f64;
            for word in words {
                if let Some(conf) = word.confidence {
                    confident += 1;
                    let chars = word.text.chars().filter(|c| !c.is_whitespace()).count();
                    value += chars as f64 * f64::from(conf.clamp(0.0, 100.0)) / 100.0;
                }
            }
            if confident > 0 {
                return Self {
                    basis: ScoreBasis::ConfidenceWeighted,
                    value,
                };
            }
        }

        Self {
            basis: ScoreBasis::CharacterCount,
            value: text.chars().filter(|c| !c.is_whitespace()).count() as f64,
        }
    }
}

/// Output of one (variant, configuration) invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionRun {
    /// Generation order: variant-major, configuration-minor.
    pub index: usize,
    pub strategy: Strategy,
    /// Scale of the variant relative to the source image (1 or 2).
    pub scale: u32,
    pub configuration: OcrConfiguration,
    /// Raw engine text, uncorrected.
    pub text: String,
    pub words: Vec<WordBox>,
    pub score: QualityScore,
    /// Why the invocation failed, if it did.
    pub failure: Option<String>,
}

impl RecognitionRun {
    /// A zero-quality run with no text, recording why the invocation failed.
    pub fn failed(
        index: usize,
        strategy: Strategy,
        scale: u32,
        configuration: OcrConfiguration,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            index,
            strategy,
            scale,
            configuration,
            text: String::new(),
            words: Vec::new(),
            score: QualityScore::zero(),
            failure: Some(reason.into()),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

/// Character / line / word counts for the terminal report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextStats {
    /// Characters excluding line breaks.
    pub characters: usize,
    /// Non-blank lines.
    pub lines: usize,
    pub words: usize,
}

impl TextStats {
    pub fn from_text(text: &str) -> Self {
        Self {
            characters: text.chars().filter(|&c| c != '\n').count(),
            lines: text.lines().filter(|line| !line.trim().is_empty()).count(),
            words: text.split_whitespace().count(),
        }
    }
}

/// Identity of the run a final result was taken from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub index: usize,
    pub strategy: Strategy,
    pub scale: u32,
    pub configuration: OcrConfiguration,
    pub score: QualityScore,
}

impl From<&RecognitionRun> for RunSummary {
    fn from(run: &RecognitionRun) -> Self {
        Self {
            index: run.index,
            strategy: run.strategy,
            scale: run.scale,
            configuration: run.configuration.clone(),
            score: run.score,
        }
    }
}

/// The pipeline's answer for one image.
///
/// `winner == None` is the "no text recognized" state: a valid outcome, not an
/// error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalResult {
    /// Corrected text of the selected run.
    pub text: String,
    pub stats: TextStats,
    /// Word boxes of the selected run, in that run's variant coordinates.
    pub words: Vec<WordBox>,
    pub winner: Option<RunSummary>,
}

impl FinalResult {
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            stats: TextStats::default(),
            words: Vec::new(),
            winner: None,
        }
    }

    /// Build the result for `run` with its already-corrected text.
    pub fn from_run(run: &RecognitionRun, corrected: String) -> Self {
        Self {
            stats: TextStats::from_text(&corrected),
            text: corrected,
            words: run.words.clone(),
            winner: Some(RunSummary::from(run)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.winner.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, confidence: Option<f32>) -> WordBox {
        WordBox::new(text, BoxRect::new(0, 0, 10, 10), confidence)
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("Enhanced".parse::<RecognitionMode>().unwrap(), RecognitionMode::Enhanced);
        assert_eq!(" standard ".parse::<RecognitionMode>().unwrap(), RecognitionMode::Standard);
        assert!("turbo".parse::<RecognitionMode>().is_err());
    }

    #[test]
    fn strategy_sets_per_mode() {
        assert_eq!(Strategy::for_mode(RecognitionMode::Standard), &[Strategy::Otsu]);
        let enhanced = Strategy::for_mode(RecognitionMode::Enhanced);
        assert_eq!(enhanced.len(), 5);
        assert_eq!(enhanced[0], Strategy::Otsu);
        assert_eq!(enhanced[4].name(), "clahe");
    }

    #[test]
    fn configuration_label() {
        let config = OcrConfiguration::new(PageSegMode::SingleBlock, "eng+ind");
        assert_eq!(config.to_string(), "psm6/eng+ind");
    }

    #[test]
    fn degenerate_rects() {
        assert!(BoxRect::new(5, 5, 0, 10).is_degenerate());
        assert!(BoxRect::new(5, 5, 10, 0).is_degenerate());
        assert!(!BoxRect::new(0, 0, 1, 1).is_degenerate());
    }

    #[test]
    fn confidence_weighted_score() {
        let words = [word("HELLO", Some(90.0)), word("WORLD", Some(50.0))];
        let score = QualityScore::assess(ScoreBasis::ConfidenceWeighted, "HELLO WORLD", &words);
        assert_eq!(score.basis, ScoreBasis::ConfidenceWeighted);
        assert!((score.value - 7.0).abs() < 1e-9);
    }

    #[test]
    fn confidence_weighted_falls_back_without_confidences() {
        let words = [word("HELLO", None)];
        let score = QualityScore::assess(ScoreBasis::ConfidenceWeighted, "HELLO  \n", &words);
        assert_eq!(score.basis, ScoreBasis::CharacterCount);
        assert_eq!(score.value, 5.0);
    }

    #[test]
    fn stats_for_multiline_text() {
        let stats = TextStats::from_text("HELLO WORLD\n\nsecond line here");
        assert_eq!(stats.lines, 2);
        assert_eq!(stats.words, 5);
        assert_eq!(stats.characters, 27);
    }

    #[test]
    fn empty_result_has_zero_stats() {
        let result = FinalResult::empty();
        assert!(result.is_empty());
        assert_eq!(result.stats, TextStats::default());
        assert!(result.words.is_empty());
    }

    #[test]
    fn failed_run_is_zero_quality() {
        let run = RecognitionRun::failed(
            3,
            Strategy::Adaptive,
            1,
            OcrConfiguration::new(PageSegMode::Automatic, "eng"),
            "engine not found",
        );
        assert!(!run.succeeded());
        assert!(run.text.is_empty());
        assert_eq!(run.score, QualityScore::zero());
    }
}
