//! Output expectations checked against a scenario's captured text.

use once_cell::sync::Lazy;
use regex::Regex;

/// `<number> secs - <number> secs`, as printed for every recognised word.
static WORD_TIMING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d+\.\d+ secs - \d+\.\d+ secs").expect("word timing pattern compiles")
});

/// Returns `true` when `output` has at least one word-timing span.
pub fn has_word_timing(output: &str) -> bool {
    WORD_TIMING.is_match(output)
}

/// One unmet expectation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    /// A literal substring did not occur in the output.
    MissingText(String),
    /// No `<n> secs - <n> secs` span was found.
    MissingWordTiming,
}

impl std::fmt::Display for Mismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mismatch::MissingText(text) => write!(f, "output does not contain {text:?}"),
            Mismatch::MissingWordTiming => {
                write!(f, "output has no \"<n> secs - <n> secs\" word timing")
            }
        }
    }
}

/// What a scenario's output must contain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expectation {
    /// Literal substrings; every one must occur.  Matching is exact, so
    /// whitespace inside an entry is significant.
    pub contains: Vec<String>,
    /// Also require at least one word-timing span.
    pub word_timing: bool,
}

impl Expectation {
    pub fn contains(text: impl Into<String>) -> Self {
        Self {
            contains: vec![text.into()],
            word_timing: false,
        }
    }

    /// Add another required substring.
    pub fn and(mut self, text: impl Into<String>) -> Self {
        self.contains.push(text.into());
        self
    }

    pub fn with_word_timing(mut self) -> Self {
        self.word_timing = true;
        self
    }

    /// Every unmet expectation, in declaration order.  Empty means pass.
    pub fn check(&self, output: &str) -> Vec<Mismatch> {
        let mut mismatches: Vec<Mismatch> = self
            .contains
            .iter()
            .filter(|text| !output.contains(text.as_str()))
            .map(|text| Mismatch::MissingText(text.clone()))
            .collect();

        if self.word_timing && !has_word_timing(output) {
            mismatches.push(Mismatch::MissingWordTiming);
        }
        mismatches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYNC_WORDS_OUTPUT: &str = "Transcription:  how old is the Brooklyn Bridge\n\
         Word: how\n\t 0.0 secs - 0.3 secs\n\
         Word: old\n\t 0.3 secs - 0.6 secs\n";

    #[test]
    fn word_timing_requires_decimal_seconds() {
        assert!(has_word_timing("\t 1.100 secs - 1.500 secs"));
        assert!(!has_word_timing("1 secs - 2 secs"));
        assert!(!has_word_timing("1.0 secs to 2.0 secs"));
        assert!(!has_word_timing(""));
    }

    #[test]
    fn passing_output_has_no_mismatches() {
        let exp = Expectation::contains("Transcription:  how old is the Brooklyn Bridge")
            .with_word_timing();
        assert!(exp.check(SYNC_WORDS_OUTPUT).is_empty());
    }

    #[test]
    fn spacing_after_colon_is_significant() {
        let single = Expectation::contains("Transcription: how old is the Brooklyn Bridge");
        assert_eq!(
            single.check(SYNC_WORDS_OUTPUT),
            vec![Mismatch::MissingText(
                "Transcription: how old is the Brooklyn Bridge".into()
            )]
        );
    }

    #[test]
    fn every_missing_piece_is_reported() {
        let exp = Expectation::contains("Transcription:")
            .and("the weather outside is sunny")
            .with_word_timing();
        let mismatches = exp.check("Error: 7 PERMISSION_DENIED");
        assert_eq!(
            mismatches,
            vec![
                Mismatch::MissingText("Transcription:".into()),
                Mismatch::MissingText("the weather outside is sunny".into()),
                Mismatch::MissingWordTiming,
            ]
        );
    }

    #[test]
    fn mismatch_display_quotes_text() {
        let m = Mismatch::MissingText("Chrome".into());
        assert_eq!(m.to_string(), "output does not contain \"Chrome\"");
    }
}
