// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text corrector: a fixed, ordered rule table applied to raw OCR output.
//
// Stages, in order:
//
// 1. Control characters are stripped (line endings normalised to `\n`; `\t`
//    kept until whitespace normalisation).
// 2. Exact substitutions from the table, case-sensitive. Whole-token rules
//    only fire on a complete word; substring rules fire anywhere.
// 3. Structural repairs (IP-like groups, numbered-list markers), repeated
//    until nothing changes because one repair can expose another.
// 4. Whitespace normalisation per line, blank-line runs collapsed.
//
// Table patterns never contain whitespace or the digit `0`, and no
// replacement contains a pattern. Together with the repair fixpoint this
// makes `correct` idempotent.

use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

/// Where a substitution pattern may match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchScope {
    /// Only as a complete word (`\b` on both sides).
    WholeToken,
    /// Anywhere, including inside words.
    Substring,
}

/// One entry of the correction table.
pub enum CorrectionRule {
    Substitution {
        pattern: &'static str,
        replacement: &'static str,
        scope: MatchScope,
        /// Compiled `\bpattern\b` for whole-token rules.
        token: Option<Regex>,
    },
    Repair {
        name: &'static str,
        matcher: Regex,
        repair: fn(&Captures<'_>) -> String,
    },
}

impl CorrectionRule {
    fn whole(pattern: &'static str, replacement: &'static str) -> Self {
        let token = Regex::new(&format!(r"\b{}\b", regex::escape(pattern)))
            .expect("escaped literal is a valid regex");
        Self::Substitution {
            pattern,
            replacement,
            scope: MatchScope::WholeToken,
            token: Some(token),
        }
    }

    fn anywhere(pattern: &'static str, replacement: &'static str) -> Self {
        Self::Substitution {
            pattern,
            replacement,
            scope: MatchScope::Substring,
            token: None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Substitution { pattern, .. } => *pattern,
            Self::Repair { name, .. } => *name,
        }
    }

    pub fn is_repair(&self) -> bool {
        matches!(self, Self::Repair { .. })
    }

    fn apply(&self, text: &str) -> String {
        match self {
            Self::Substitution {
                pattern,
                replacement,
                token: Some(token),
                ..
            } => {
                if !text.contains(pattern) {
                    return text.to_string();
                }
                token.replace_all(text, *replacement).into_owned()
            }
            Self::Substitution {
                pattern,
                replacement,
                token: None,
                ..
            } => text.replace(pattern, replacement),
            Self::Repair {
                matcher, repair, ..
            } => matcher.replace_all(text, *repair).into_owned(),
        }
    }
}

impl fmt::Debug for CorrectionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Substitution {
                pattern,
                replacement,
                scope,
                ..
            } => f
                .debug_struct("Substitution")
                .field("pattern", pattern)
                .field("replacement", replacement)
                .field("scope", scope)
                .finish(),
            Self::Repair { name, matcher, .. } => f
                .debug_struct("Repair")
                .field("name", name)
                .field("matcher", &matcher.as_str())
                .finish(),
        }
    }
}

/// Four dot-separated groups of 1-3 letters or digits. Only capital `O` is
/// read as a zero.
fn repair_ip_like(caps: &Captures<'_>) -> String {
    let found = &caps[0];
    if found.chars().any(|c| c.is_ascii_digit()) {
        found.replace('O', "0")
    } else {
        found.to_string()
    }
}

/// `22.Untuk` → `22. Untuk`.
fn repair_list_marker(caps: &Captures<'_>) -> String {
    format!("{}. {}", &caps[1], &caps[2])
}

static RULES: LazyLock<Vec<CorrectionRule>> = LazyLock::new(|| {
    use CorrectionRule as R;

    let substitutions = vec![
        // Typography the engine passes through.
        R::anywhere("\u{FB01}", "fi"),
        R::anywhere("\u{FB02}", "fl"),
        R::anywhere("\u{2018}", "'"),
        R::anywhere("\u{2019}", "'"),
        R::anywhere("\u{201C}", "\""),
        R::anywhere("\u{201D}", "\""),
        // Common Indonesian words.
        R::whole("Unluk", "Untuk"),
        R::whole("unluk", "untuk"),
        R::whole("vang", "yang"),
        R::whole("Vang", "Yang"),
        R::whole("dengen", "dengan"),
        R::whole("Dengen", "Dengan"),
        R::whole("dar1", "dari"),
        R::whole("darl", "dari"),
        R::whole("pacla", "pada"),
        R::whole("Pacla", "Pada"),
        R::whole("aclalah", "adalah"),
        R::whole("Aclalah", "Adalah"),
        R::whole("ticlak", "tidak"),
        R::whole("Ticlak", "Tidak"),
        R::whole("tldak", "tidak"),
        R::whole("clalam", "dalam"),
        R::whole("Clalam", "Dalam"),
        R::whole("olch", "oleh"),
        R::whole("lni", "ini"),
        R::whole("inl", "ini"),
        R::whole("Inl", "Ini"),
        R::whole("ltu", "itu"),
        R::whole("rnenjadi", "menjadi"),
        R::whole("rnaka", "maka"),
        R::whole("rnerupakan", "merupakan"),
        R::whole("sebagal", "sebagai"),
        R::whole("Sebagal", "Sebagai"),
        R::whole("berikul", "berikut"),
        R::whole("Berikul", "Berikut"),
        R::whole("tlga", "tiga"),
        // Exam-sheet vocabulary.
        R::whole("Jawahan", "Jawaban"),
        R::whole("jawahan", "jawaban"),
        R::whole("Soai", "Soal"),
        R::whole("soai", "soal"),
        R::whole("Nilal", "Nilai"),
        R::whole("nilal", "nilai"),
        R::whole("Narna", "Nama"),
        R::whole("narna", "nama"),
        R::whole("Kelos", "Kelas"),
        R::whole("kelos", "kelas"),
        R::whole("Tanggai", "Tanggal"),
        R::whole("tanggai", "tanggal"),
        R::whole("Kuliab", "Kuliah"),
        R::whole("kuliab", "kuliah"),
        R::whole("Citrn", "Citra"),
        R::whole("Digltal", "Digital"),
        R::whole("digltal", "digital"),
        R::whole("Mahasiswo", "Mahasiswa"),
        // English.
        R::whole("tbe", "the"),
        R::whole("Tbe", "The"),
        R::whole("wlth", "with"),
        // Fragments inside longer words.
        R::anywhere("Pengolahon", "Pengolahan"),
        R::anywhere("rnahasiswa", "mahasiswa"),
        R::anywhere("Inforrnasi", "Informasi"),
        R::anywhere("inforrnasi", "informasi"),
        R::anywhere("Universitos", "Universitas"),
    ];

    let repairs = vec![
        R::Repair {
            name: "ip-like-zero",
            matcher: Regex::new(r"\b[0-9A-Za-z]{1,3}(?:\.[0-9A-Za-z]{1,3}){3}\b")
                .expect("valid IP-like regex"),
            repair: repair_ip_like,
        },
        R::Repair {
            name: "list-marker-space",
            matcher: Regex::new(r"\b(\d+)\.([A-Za-z]\w)").expect("valid list marker regex"),
            repair: repair_list_marker,
        },
    ];

    substitutions.into_iter().chain(repairs).collect()
});

/// Applies the correction table to raw OCR text.
///
/// Pure and deterministic; `correct(correct(t)) == correct(t)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCorrector;

impl TextCorrector {
    pub fn new() -> Self {
        Self
    }

    /// The rule table, in application order.
    pub fn rules(&self) -> &'static [CorrectionRule] {
        &RULES
    }

    pub fn correct(&self, raw: &str) -> String {
        let mut text = strip_controls(raw);

        for rule in RULES.iter().filter(|rule| !rule.is_repair()) {
            text = rule.apply(&text);
        }

        // Repairs converge: each pass either removes an `O` or inserts a space
        // after a list marker.
        loop {
            let before = text.clone();
            for rule in RULES.iter().filter(|rule| rule.is_repair()) {
                text = rule.apply(&text);
            }
            if text == before {
                break;
            }
        }

        let corrected = normalize_whitespace(&text);
        if corrected != raw {
            debug!(
                raw_chars = raw.chars().count(),
                corrected_chars = corrected.chars().count(),
                "Text corrected"
            );
        }
        corrected
    }
}

/// Normalise line endings, then drop every control character except `\n`
/// and `\t`.
fn strip_controls(raw: &str) -> String {
    raw.replace("\r\n", "\n")
        .replace('\r', "\n")
        .chars()
        .filter(|&c| !c.is_control() || c == '\n' || c == '\t')
        .collect()
}

/// Collapse whitespace within lines and blank-line runs between them.
fn normalize_whitespace(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut pending_blank = false;

    for line in text.split('\n') {
        let squeezed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if squeezed.is_empty() {
            pending_blank = !lines.is_empty();
            continue;
        }
        if pending_blank {
            lines.push(String::new());
            pending_blank = false;
        }
        lines.push(squeezed);
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn correct(text: &str) -> String {
        TextCorrector::new().correct(text)
    }

    #[test]
    fn ip_like_letters_become_zero() {
        assert_eq!(correct("192.177.1OO.32"), "192.177.100.32");
        assert_eq!(correct("host 1O.0.O.1 up"), "host 10.0.0.1 up");
    }

    #[test]
    fn ip_like_lowercase_o_is_kept() {
        assert_eq!(correct("10.1o.0.O"), "10.1o.0.0");
    }

    #[test]
    fn ip_like_without_digits_is_untouched() {
        assert_eq!(correct("O.O.O.O"), "O.O.O.O");
    }

    #[test]
    fn list_markers_get_a_space() {
        assert_eq!(correct("22.Untuk"), "22. Untuk");
        assert_eq!(correct("1.Nama\n2.Kelas"), "1. Nama\n2. Kelas");
        assert_eq!(correct("3. Soal"), "3. Soal");
    }

    #[test]
    fn repairs_reach_a_fixpoint() {
        assert_eq!(correct("1.ab.c.2.O"), "1. ab.c.2.0");
        assert_eq!(correct("1.O.ab.c"), "1.0. ab.c");
    }

    #[test]
    fn whole_token_substitutions() {
        assert_eq!(correct("Unluk"), "Untuk");
        assert_eq!(correct("vang"), "yang");
        assert_eq!(correct("Jawahan Soai 3 vang benar"), "Jawaban Soal 3 yang benar");
        assert_eq!(correct("(lni)"), "(ini)");
    }

    #[test]
    fn whole_token_rules_ignore_word_fragments() {
        assert_eq!(correct("vangs"), "vangs");
        assert_eq!(correct("kelosan"), "kelosan");
    }

    #[test]
    fn substitutions_are_case_sensitive() {
        assert_eq!(correct("VANG"), "VANG");
    }

    #[test]
    fn substring_substitutions() {
        assert_eq!(correct("Prodi Inforrnasi"), "Prodi Informasi");
        assert_eq!(correct("parainforrnasi"), "parainformasi");
        assert_eq!(correct("\u{FB01}le \u{201C}x\u{201D}"), "file \"x\"");
    }

    #[test]
    fn control_characters_are_stripped() {
        assert_eq!(correct("HELLO\r\nWORLD\u{c}"), "HELLO\nWORLD");
        assert_eq!(correct("a\u{7}b"), "ab");
    }

    #[test]
    fn whitespace_is_normalised() {
        assert_eq!(correct("  a \t  b  \n\n\n\n c  \n\n"), "a b\n\nc");
        assert_eq!(correct("\n\n x\ny\n"), "x\ny");
        assert_eq!(correct(" \n\t\n"), "");
    }

    #[test]
    fn table_holds_its_invariants() {
        let rules = TextCorrector::new().rules();
        let substitutions: Vec<(&str, &str)> = rules
            .iter()
            .filter_map(|rule| match rule {
                CorrectionRule::Substitution {
                    pattern,
                    replacement,
                    ..
                } => Some((*pattern, *replacement)),
                CorrectionRule::Repair { .. } => None,
            })
            .collect();

        assert!(substitutions.len() >= 40);
        for (pattern, _) in &substitutions {
            assert!(!pattern.is_empty());
            assert!(!pattern.chars().any(char::is_whitespace), "{pattern}");
            assert!(!pattern.contains('0'), "{pattern}");
        }
        for (_, replacement) in &substitutions {
            for (pattern, _) in &substitutions {
                assert!(
                    !replacement.contains(pattern),
                    "{replacement} contains {pattern}"
                );
            }
        }
        assert!(rules.iter().rev().take(2).all(CorrectionRule::is_repair));
    }

    #[test]
    fn sample_exam_sheet() {
        let raw = "Narna : Budi\r\nKelos: 3A\n\n\n1.Jawahan  pacla soai\u{c}\n";
        assert_eq!(
            correct(raw),
            "Nama : Budi\nKelas: 3A\n\n1. Jawaban pada soal"
        );
    }

    fn fragment() -> impl Strategy<Value = String> {
        let vocabulary: Vec<String> = TextCorrector::new()
            .rules()
            .iter()
            .filter(|rule| !rule.is_repair())
            .map(|rule| rule.name().to_string())
            .collect();
        prop_oneof![
            prop::sample::select(vocabulary),
            "[A-Za-z0-9Oo.]{1,6}",
            prop::sample::select(vec![
                " ".to_string(),
                "  ".to_string(),
                "\n".to_string(),
                "\t".to_string(),
                "\r".to_string(),
                "\u{c}".to_string(),
                ".".to_string(),
                "\u{a0}".to_string(),
            ]),
        ]
    }

    proptest! {
        #[test]
        fn correction_is_idempotent(parts in prop::collection::vec(fragment(), 0..40)) {
            let text = parts.concat();
            let once = correct(&text);
            prop_assert_eq!(correct(&once), once);
        }

        #[test]
        fn correction_is_idempotent_on_arbitrary_text(text in "\\PC{0,120}") {
            let once = correct(&text);
            prop_assert_eq!(correct(&once), once);
        }
    }
}
