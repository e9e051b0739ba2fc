// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recognition runner — one OCR invocation per (variant, configuration) pair.
//
// Each pair runs as its own task, gated by a semaphore so at most
// `max_concurrency` engine calls are in flight at once. A task keeps its
// permit until the engine call has ended: on timeout the call's future is
// dropped first, which stops the engine (the Tesseract child is killed).
// Images are shared read-only through `Arc`. Results are collected in
// generation order (variant-major, configuration-minor) regardless of which
// call finishes first.

use std::sync::Arc;
use std::time::Duration;

use image::DynamicImage;
use lesewerk_core::config::RunnerSettings;
use lesewerk_core::error::{LesewerkError, Result};
use lesewerk_core::types::{OcrConfiguration, QualityScore, RecognitionRun, Strategy};
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use super::ocr::TextRecognizer;
use super::variants::Variant;

/// Runs the cross product of variants and configurations against an engine.
#[derive(Clone)]
pub struct RecognitionRunner {
    engine: Arc<dyn TextRecognizer>,
    max_concurrency: usize,
    timeout: Duration,
}

impl RecognitionRunner {
    pub fn new(engine: Arc<dyn TextRecognizer>, settings: &RunnerSettings) -> Self {
        Self::with_limits(
            engine,
            settings.concurrency(),
            Duration::from_secs(settings.timeout_secs),
        )
    }

    /// Explicit pool width and per-call timeout. A width of zero is treated as
    /// one.
    pub fn with_limits(
        engine: Arc<dyn TextRecognizer>,
        max_concurrency: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            engine,
            max_concurrency: max_concurrency.max(1),
            timeout,
        }
    }

    /// Recognise every variant under every configuration.
    ///
    /// A failed invocation becomes a zero-quality run carrying the failure;
    /// the others still run. Only when every invocation failed does it return
    /// an error: `Timeout` when each of them timed out, `EngineUnavailable`
    /// otherwise.
    #[instrument(skip_all, fields(engine = self.engine.name(), variants = variants.len(), configurations = configurations.len()))]
    pub async fn run(
        &self,
        variants: &[Variant],
        configurations: &[OcrConfiguration],
    ) -> Result<Vec<RecognitionRun>> {
        let total = variants.len() * configurations.len();
        if total == 0 {
            debug!("Nothing to recognise");
            return Ok(Vec::new());
        }
        info!(
            runs = total,
            workers = self.max_concurrency,
            "Starting recognition runs"
        );

        let permits = Arc::new(Semaphore::new(self.max_concurrency));
        let mut handles = Vec::with_capacity(total);

        for (variant_idx, variant) in variants.iter().enumerate() {
            let image = Arc::new(variant.to_dynamic());
            for (config_idx, configuration) in configurations.iter().enumerate() {
                let index = variant_idx * configurations.len() + config_idx;
                let task = Invocation {
                    index,
                    strategy: variant.strategy,
                    scale: variant.scale,
                    configuration: configuration.clone(),
                    image: Arc::clone(&image),
                };
                let engine = Arc::clone(&self.engine);
                let permits = Arc::clone(&permits);
                let timeout = self.timeout;
                handles.push(tokio::spawn(async move {
                    task.execute(engine, permits, timeout).await
                }));
            }
        }

        let mut runs = Vec::with_capacity(total);
        let mut timed_out = 0;
        // First failure that was not a timeout, in generation order.
        let mut hard_failure = None;
        for handle in handles {
            match handle.await {
                Ok(attempt) => {
                    if attempt.timed_out {
                        timed_out += 1;
                    } else if hard_failure.is_none() {
                        hard_failure = attempt.run.failure.clone();
                    }
                    runs.push(attempt.run);
                }
                Err(err) => {
                    // Only reachable if a task panicked or the runtime shut down.
                    return Err(LesewerkError::OcrError(format!(
                        "recognition task aborted: {err}"
                    )));
                }
            }
        }
        runs.sort_by_key(|run| run.index);

        let failed = runs.iter().filter(|run| !run.succeeded()).count();
        if timed_out == runs.len() {
            warn!(runs = runs.len(), timeout = ?self.timeout, "Every recognition run timed out");
            return Err(LesewerkError::Timeout(self.timeout));
        }
        if failed == runs.len() {
            let reason = hard_failure.unwrap_or_default();
            warn!(runs = runs.len(), reason = %reason, "Every recognition run failed");
            return Err(LesewerkError::EngineUnavailable(reason));
        }

        info!(
            runs = runs.len(),
            failed,
            "Recognition runs complete"
        );
        Ok(runs)
    }
}

/// A finished invocation and whether it ended by timing out.
struct Attempt {
    run: RecognitionRun,
    timed_out: bool,
}

/// One pending (variant, configuration) pair.
struct Invocation {
    index: usize,
    strategy: Strategy,
    scale: u32,
    configuration: OcrConfiguration,
    image: Arc<DynamicImage>,
}

impl Invocation {
    async fn execute(
        self,
        engine: Arc<dyn TextRecognizer>,
        permits: Arc<Semaphore>,
        timeout: Duration,
    ) -> Attempt {
        let _permit = match permits.acquire_owned().await {
            Ok(permit) => permit,
            Err(err) => return self.failed(format!("worker pool closed: {err}"), false),
        };

        // The call future is dropped here, before `_permit`.
        let result =
            tokio::time::timeout(timeout, engine.recognize(&self.image, &self.configuration)).await;
        match result {
            Ok(Ok(output)) => {
                let score = QualityScore::assess(
                    self.configuration.score_basis,
                    &output.text,
                    &output.words,
                );
                debug!(
                    index = self.index,
                    strategy = %self.strategy,
                    config = %self.configuration,
                    score = score.value,
                    "Run succeeded"
                );
                Attempt {
                    run: RecognitionRun {
                        index: self.index,
                        strategy: self.strategy,
                        scale: self.scale,
                        configuration: self.configuration,
                        text: output.text,
                        words: output.words,
                        score,
                        failure: None,
                    },
                    timed_out: false,
                }
            }
            Ok(Err(err)) => {
                warn!(index = self.index, strategy = %self.strategy, config = %self.configuration, error = %err, "Run failed");
                let timed_out = matches!(err, LesewerkError::Timeout(_));
                self.failed(err.to_string(), timed_out)
            }
            Err(_) => {
                warn!(index = self.index, ?timeout, "Run timed out");
                self.failed(LesewerkError::Timeout(timeout).to_string(), true)
            }
        }
    }

    fn failed(self, reason: String, timed_out: bool) -> Attempt {
        Attempt {
            run: RecognitionRun::failed(
                self.index,
                self.strategy,
                self.scale,
                self.configuration,
                reason,
            ),
            timed_out,
        }
    }
}
