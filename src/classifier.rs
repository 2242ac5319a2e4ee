//! Security keyword classifier.
//!
//! All keywords are compiled into a single case-insensitive alternation so
//! each text is scanned once no matter how large the vocabulary is.

use crate::config::{ClassifierConfig, MatchMode};
use crate::error::{ReportError, Result};
use regex::{Regex, RegexBuilder};
use std::collections::HashSet;

/// A keyword list together with how it should be compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordVocabulary {
    keywords: Vec<String>,
    mode: MatchMode,
}

impl KeywordVocabulary {
    /// Plain-text keywords, matched as literal substrings.
    pub fn literal<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_mode(keywords, MatchMode::Literal)
    }

    /// Keywords that are regular expression fragments.
    pub fn patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_mode(patterns, MatchMode::Pattern)
    }

    pub fn with_mode<I, S>(keywords: I, mode: MatchMode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords.into_iter().map(Into::into).collect(),
            mode,
        }
    }

    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self::with_mode(config.keywords.iter().cloned(), config.mode)
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }
}

/// Flags free text that mentions any keyword of its vocabulary.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    matcher: Regex,
    keyword_count: usize,
}

impl KeywordClassifier {
    /// Compile a vocabulary into one matcher.
    ///
    /// Blank entries and duplicates are dropped; the first occurrence keeps its
    /// position. Matching is ASCII case-insensitive and has no word-boundary
    /// requirement.
    pub fn new(vocabulary: &KeywordVocabulary) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut alternatives = Vec::new();

        for keyword in vocabulary.keywords() {
            let trimmed = keyword.trim();
            if trimmed.is_empty() || !seen.insert(trimmed.to_ascii_lowercase()) {
                continue;
            }
            let alt = match vocabulary.mode() {
                MatchMode::Literal => regex::escape(trimmed),
                MatchMode::Pattern => format!("(?:{trimmed})"),
            };
            alternatives.push(alt);
        }

        if alternatives.is_empty() {
            return Err(ReportError::ClassifierConstruction(
                "keyword vocabulary is empty".to_string(),
            ));
        }

        let matcher = RegexBuilder::new(&alternatives.join("|"))
            .case_insensitive(true)
            .unicode(false)
            .build()
            .map_err(|e| ReportError::ClassifierConstruction(e.to_string()))?;

        Ok(Self {
            matcher,
            keyword_count: alternatives.len(),
        })
    }

    /// True if at least one keyword occurs anywhere in `text`.
    pub fn classify(&self, text: &str) -> bool {
        !text.is_empty() && self.matcher.is_match(text)
    }

    /// Number of distinct keywords compiled into the matcher.
    pub fn keyword_count(&self) -> usize {
        self.keyword_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants;

    fn default_classifier() -> KeywordClassifier {
        KeywordClassifier::new(&KeywordVocabulary::literal(constants::default_keywords())).unwrap()
    }

    #[test]
    fn test_flags_security_text() {
        let c = default_classifier();
        assert!(c.classify("Fix buffer overflow in parser"));
        assert!(!c.classify("Update README formatting"));
        assert!(!c.classify(""));
        assert!(!c.classify(" "));
    }

    #[test]
    fn test_substring_without_word_boundary() {
        let c = default_classifier();
        assert!(c.classify("add CSS styling"));
        // "dos" inside "todos"
        assert!(c.classify("Clean up todos"));
        assert!(c.classify("ADD DOS GUARD"));
    }

    #[test]
    fn test_multi_word_keywords() {
        let c = KeywordClassifier::new(&KeywordVocabulary::literal(["gain access", "cross site"]))
            .unwrap();
        assert!(c.classify("attacker may Gain Access to tokens"));
        assert!(c.classify("cross site scripting"));
        assert!(!c.classify("cross-site scripting"));
    }

    #[test]
    fn test_literal_keywords_are_escaped() {
        let c = KeywordClassifier::new(&KeywordVocabulary::literal(["c++", "a.b"])).unwrap();
        assert!(c.classify("port to C++"));
        assert!(!c.classify("axb"));
        assert!(c.classify("a.b"));
    }

    #[test]
    fn test_arbitrary_bytes_do_not_panic() {
        let c = default_classifier();
        assert!(!c.classify("\u{0}\u{1}\u{7f}\t\r\n"));
        assert!(c.classify("\u{0}exploit\u{1b}[0m"));
        assert!(!c.classify("naïve café ünïcode"));
        assert!(c.classify("überCRASHtest"));
    }

    #[test]
    fn test_duplicates_and_blanks_are_tolerated() {
        let c = KeywordClassifier::new(&KeywordVocabulary::literal([
            "race", "RACE", "", "  ", "race",
        ]))
        .unwrap();
        assert_eq!(c.keyword_count(), 1);
        assert!(c.classify("data race"));
    }

    #[test]
    fn test_empty_vocabulary_is_rejected() {
        let empty: Vec<String> = Vec::new();
        let err = KeywordClassifier::new(&KeywordVocabulary::literal(empty)).unwrap_err();
        assert!(matches!(err, ReportError::ClassifierConstruction(_)));
    }

    #[test]
    fn test_invalid_pattern_is_construction_error() {
        let err = KeywordClassifier::new(&KeywordVocabulary::patterns(["overflow", "(unclosed"]))
            .unwrap_err();
        assert!(matches!(err, ReportError::ClassifierConstruction(_)));
    }

    #[test]
    fn test_pattern_mode() {
        let c = KeywordClassifier::new(&KeywordVocabulary::patterns([r"cve-\d{4}"])).unwrap();
        assert!(c.classify("Fixes CVE-2024 issue"));
        assert!(!c.classify("Fixes CVE-XXXX issue"));
    }

    #[test]
    fn test_deterministic() {
        let c = default_classifier();
        let text = "Prevent SQL injection in login";
        let first = c.classify(text);
        for _ in 0..10 {
            assert_eq!(c.classify(text), first);
        }
    }
}
