// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Result selector — picks the best recognition run.

use std::cmp::Ordering;

use lesewerk_core::types::{FinalResult, QualityScore, RecognitionRun, ScoreBasis};
use tracing::{debug, info, instrument};

use super::correct::TextCorrector;

/// A run that produced text, with its corrected form and final score.
#[derive(Debug)]
struct Candidate<'a> {
    run: &'a RecognitionRun,
    corrected: String,
    score: QualityScore,
    chars: usize,
}

/// Chooses one run out of many with a total, deterministic order.
///
/// Runs are corrected first and empty ones dropped. Scores are only compared
/// within one basis: if any candidate is confidence-weighted, character-count
/// candidates are ignored. Ties go to more corrected characters, then to the
/// earlier run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultSelector {
    corrector: TextCorrector,
}

impl ResultSelector {
    pub fn new(corrector: TextCorrector) -> Self {
        Self { corrector }
    }

    /// Score `run` on its corrected text, the way `select` compares runs.
    /// Failed runs keep their zero score.
    pub fn rescore(&self, run: &RecognitionRun) -> QualityScore {
        if !run.succeeded() {
            return run.score;
        }
        let corrected = self.corrector.correct(&run.text);
        QualityScore::assess(run.configuration.score_basis, &corrected, &run.words)
    }

    #[instrument(skip_all, fields(runs = runs.len()))]
    pub fn select(&self, runs: &[RecognitionRun]) -> FinalResult {
        let candidates: Vec<Candidate<'_>> = runs
            .iter()
            .filter(|run| run.succeeded())
            .filter_map(|run| {
                let corrected = self.corrector.correct(&run.text);
                let chars = corrected.chars().filter(|c| !c.is_whitespace()).count();
                if chars == 0 {
                    return None;
                }
                let score = QualityScore::assess(
                    run.configuration.score_basis,
                    &corrected,
                    &run.words,
                );
                Some(Candidate {
                    run,
                    corrected,
                    score,
                    chars,
                })
            })
            .collect();

        let basis = if candidates
            .iter()
            .any(|c| c.score.basis == ScoreBasis::ConfidenceWeighted)
        {
            ScoreBasis::ConfidenceWeighted
        } else {
            ScoreBasis::CharacterCount
        };

        let best = candidates
            .into_iter()
            .filter(|c| c.score.basis == basis)
            .reduce(|best, next| match rank(&next, &best) {
                Ordering::Greater => next,
                _ => best,
            });

        let Some(best) = best else {
            info!("No run produced text");
            return FinalResult::empty();
        };

        debug!(
            index = best.run.index,
            strategy = %best.run.strategy,
            config = %best.run.configuration,
            score = best.score.value,
            ?basis,
            "Run selected"
        );
        let score = best.score;
        let mut result = FinalResult::from_run(best.run, best.corrected);
        if let Some(winner) = result.winner.as_mut() {
            winner.score = score;
        }
        info!(
            characters = result.stats.characters,
            words = result.stats.words,
            "Result selected"
        );
        result
    }
}

/// `Greater` when `a` beats `b`.
fn rank(a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    a.score
        .value
        .total_cmp(&b.score.value)
        .then(a.chars.cmp(&b.chars))
        .then(b.run.index.cmp(&a.run.index))
}
