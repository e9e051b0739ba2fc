// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text stages: rule-based OCR correction and best-run selection.

pub mod correct;
pub mod select;

pub use correct::{CorrectionRule, MatchScope, TextCorrector};
pub use select::ResultSelector;
