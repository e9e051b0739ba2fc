// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the terminal report.
//
// Every technical error is mapped to a plain sentence with a clear suggestion.
// The severity picks the prefix the terminal report uses.

use crate::error::LesewerkError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// A hiccup worth retrying as-is (timeouts).
    Transient,
    /// The user must do something (install the engine, fix a path).
    ActionRequired,
    /// Retrying the same input will not help.
    Permanent,
}

/// A human-readable error with plain message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// One-line summary.
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
    pub severity: Severity,
}

/// Convert a `LesewerkError` into a `HumanError`.
pub fn humanize_error(err: &LesewerkError) -> HumanError {
    match err {
        LesewerkError::InputNotFound(detail) => HumanError {
            message: "The image file could not be opened.".into(),
            suggestion: format!(
                "Check the path, or give the full path to the file. ({detail})"
            ),
            severity: Severity::ActionRequired,
        },

        LesewerkError::ImageError(_) => HumanError {
            message: "There's a problem with this image.".into(),
            suggestion: "The image may be damaged or in an unusual format. Try saving it as JPEG or PNG first.".into(),
            severity: Severity::Permanent,
        },

        LesewerkError::VariantGeneration { strategy, .. } => HumanError {
            message: format!("The `{strategy}` preprocessing step was skipped."),
            suggestion: "Other strategies were still tried; no action needed.".into(),
            severity: Severity::Transient,
        },

        LesewerkError::NoVariants => HumanError {
            message: "The image could not be prepared for text recognition.".into(),
            suggestion: "The image may be empty or extremely small. Try a larger photo.".into(),
            severity: Severity::Permanent,
        },

        LesewerkError::EngineUnavailable(detail) => HumanError {
            message: "Tesseract OCR is not available.".into(),
            suggestion: if detail.contains("language") || detail.contains("traineddata") {
                format!("Install the missing Tesseract language data. ({detail})")
            } else {
                "Install Tesseract OCR (the program, not only a library) or pass its path with --tesseract.".into()
            },
            severity: Severity::ActionRequired,
        },

        LesewerkError::UnsupportedInput(_) => HumanError {
            message: "The OCR engine could not read a prepared image.".into(),
            suggestion: "Try the other mode, or convert the photo to PNG.".into(),
            severity: Severity::Permanent,
        },

        LesewerkError::OcrError(_) => HumanError {
            message: "Text recognition didn't work on this image.".into(),
            suggestion: "Try again with better lighting, with the text sharp and in focus.".into(),
            severity: Severity::Transient,
        },

        LesewerkError::Timeout(limit) => HumanError {
            message: "Text recognition took too long.".into(),
            suggestion: format!(
                "Raise the limit with --timeout-secs (currently {}s) or use standard mode.",
                limit.as_secs()
            ),
            severity: Severity::Transient,
        },

        LesewerkError::Config(detail) => HumanError {
            message: "The configuration is not valid.".into(),
            suggestion: format!("Fix the setting and try again. ({detail})"),
            severity: Severity::ActionRequired,
        },

        LesewerkError::Io(io_err) => HumanError {
            message: "A file could not be read or written.".into(),
            suggestion: match io_err.kind() {
                std::io::ErrorKind::PermissionDenied => {
                    "Choose an output folder you are allowed to write to.".into()
                }
                std::io::ErrorKind::NotFound => "Check that the folder exists.".into(),
                _ => format!("Check free disk space and try again. ({io_err})"),
            },
            severity: Severity::ActionRequired,
        },

        LesewerkError::Serialization(_) => HumanError {
            message: "The configuration file could not be understood.".into(),
            suggestion: "Check the JSON syntax of the file passed with --config.".into(),
            severity: Severity::ActionRequired,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn missing_engine_asks_for_installation() {
        let human = humanize_error(&LesewerkError::EngineUnavailable(
            "tesseract not found on PATH".into(),
        ));
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(human.suggestion.contains("Install Tesseract"));
    }

    #[test]
    fn missing_language_names_the_language_data() {
        let human = humanize_error(&LesewerkError::EngineUnavailable(
            "Failed loading language 'ind'".into(),
        ));
        assert!(human.suggestion.contains("language data"));
    }

    #[test]
    fn timeout_mentions_the_limit() {
        let human = humanize_error(&LesewerkError::Timeout(Duration::from_secs(90)));
        assert_eq!(human.severity, Severity::Transient);
        assert!(human.suggestion.contains("90s"));
    }

    #[test]
    fn input_not_found_keeps_the_detail() {
        let human = humanize_error(&LesewerkError::InputNotFound("nota.jpg".into()));
        assert!(human.suggestion.contains("nota.jpg"));
    }

    #[test]
    fn io_permission_denied() {
        let err = LesewerkError::Io(std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        let human = humanize_error(&err);
        assert!(human.suggestion.contains("allowed to write"));
    }
}
