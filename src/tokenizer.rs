//! Lexical tokenizer for the sparse index
//!
//! Lowercases, collapses multi-word legal phrases into single underscore-joined
//! tokens ("force majeure" -> "force_majeure") and drops short and stop words.

use regex::{Captures, Regex};
use std::collections::HashSet;

/// Multi-word phrases that are indexed as one token
pub const LEGAL_PHRASES: &[&str] = &[
    "indemnify and hold harmless",
    "limitation of liability",
    "termination for convenience",
    "intellectual property",
    "confidential information",
    "breach of contract",
    "liquidated damages",
    "reasonable efforts",
    "governing law",
    "force majeure",
    "without notice",
    "notice period",
    "material breach",
    "due diligence",
    "good faith",
    "best efforts",
    "trade secret",
    "sole discretion",
    "joint and several",
    "consequential damages",
    "change of control",
];

pub const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "was", "were", "been", "being", "has", "have", "had", "this",
    "that", "these", "those", "with", "from", "into", "onto", "upon", "its", "their", "them",
    "they", "such", "any", "all", "each", "other", "than", "then", "there", "which", "who",
    "whom", "what", "when", "where", "why", "how", "will", "would", "can", "could", "does",
    "did", "not", "but", "our", "you", "your", "his", "her", "she", "him", "also", "about",
    "under", "over", "per", "via",
];

const MIN_TOKEN_CHARS: usize = 3;

/// Tokenizer producing the token stream indexed by BM25
pub struct LegalTokenizer {
    phrase_pattern: Regex,
    stop_words: HashSet<&'static str>,
}

impl LegalTokenizer {
    pub fn new() -> Self {
        let mut phrases: Vec<&str> = LEGAL_PHRASES.to_vec();
        // Longest first so overlapping phrases prefer the most specific match
        phrases.sort_by_key(|p| std::cmp::Reverse(p.len()));

        let alternation = phrases
            .iter()
            .map(|phrase| {
                phrase
                    .split_whitespace()
                    .map(regex::escape)
                    .collect::<Vec<_>>()
                    .join(r"\s+")
            })
            .collect::<Vec<_>>()
            .join("|");

        Self {
            phrase_pattern: Regex::new(&format!(r"\b(?:{})\b", alternation))
                .expect("phrase pattern is built from escaped literals"),
            stop_words: STOP_WORDS.iter().copied().collect(),
        }
    }

    /// Tokenize text for indexing or querying
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let collapsed = self
            .phrase_pattern
            .replace_all(&lowered, |caps: &Captures| {
                caps[0].split_whitespace().collect::<Vec<_>>().join("_")
            });

        collapsed
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|token| token.chars().count() >= MIN_TOKEN_CHARS)
            .filter(|token| !self.stop_words.contains(token))
            .map(str::to_string)
            .collect()
    }
}

impl Default for LegalTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowercase alphanumeric words, no filtering. Used for keyword matching.
pub fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric() && c != '-')
        .map(|w| w.trim_matches('-'))
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_tokenization() {
        let tokenizer = LegalTokenizer::new();
        let tokens = tokenizer.tokenize("The Supplier SHALL pay all invoices.");
        assert_eq!(tokens, vec!["supplier", "shall", "pay", "invoices"]);
    }

    #[test]
    fn test_phrases_collapsed() {
        let tokenizer = LegalTokenizer::new();
        let tokens =
            tokenizer.tokenize("Neither party is liable for Force  Majeure events; see Limitation of Liability.");
        assert!(tokens.contains(&"force_majeure".to_string()));
        assert!(tokens.contains(&"limitation_of_liability".to_string()));
        assert!(!tokens.contains(&"majeure".to_string()));
        assert!(tokens.iter().filter(|t| t.contains('_')).count() == 2);
    }

    #[test]
    fn test_phrase_needs_word_boundary() {
        let tokenizer = LegalTokenizer::new();
        let tokens = tokenizer.tokenize("megood faithless");
        assert!(!tokens.iter().any(|t| t == "good_faith"));
    }

    #[test]
    fn test_short_and_stop_words_removed() {
        let tokenizer = LegalTokenizer::new();
        let tokens = tokenizer.tokenize("a to of is it the and 30 days");
        assert_eq!(tokens, vec!["days"]);
    }

    #[test]
    fn test_empty_text() {
        let tokenizer = LegalTokenizer::new();
        assert!(tokenizer.tokenize("  ... ").is_empty());
    }

    #[test]
    fn test_words_keep_hyphenated_terms() {
        let collected: Vec<String> = words("Non-Disclosure, terms!").collect();
        assert_eq!(collected, vec!["non-disclosure", "terms"]);
    }
}
