// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Lesewerk.

use std::time::Duration;

use thiserror::Error;

/// Top-level error type for all Lesewerk operations.
///
/// Per-strategy and per-run variants (`VariantGeneration`, `UnsupportedInput`,
/// `OcrError`, `Timeout`) are normally recorded and recovered inside their own
/// stage. `Timeout` also ends the pipeline when every run timed out.
#[derive(Debug, Error)]
pub enum LesewerkError {
    // -- Input --
    #[error("input image not found or unreadable: {0}")]
    InputNotFound(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Preprocessing --
    #[error("variant `{strategy}` could not be generated: {reason}")]
    VariantGeneration { strategy: String, reason: String },

    #[error("no preprocessing variant could be generated")]
    NoVariants,

    // -- Recognition --
    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("OCR engine rejected the input: {0}")]
    UnsupportedInput(String),

    #[error("OCR failed: {0}")]
    OcrError(String),

    #[error("OCR invocation timed out after {0:?}")]
    Timeout(Duration),

    // -- Configuration / persistence --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LesewerkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_strategy() {
        let err = LesewerkError::VariantGeneration {
            strategy: "adaptive".into(),
            reason: "empty image".into(),
        };
        assert_eq!(
            err.to_string(),
            "variant `adaptive` could not be generated: empty image"
        );
    }
}
