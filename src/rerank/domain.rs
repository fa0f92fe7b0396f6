//! Legal-domain heuristics
//!
//! `domain = importance * 0.3 + section_relevance * 0.4 + clause_similarity * 0.3`

use crate::chunking::{Chunk, SectionType};
use crate::tokenizer::{words, LegalTokenizer};
use std::collections::HashSet;

const IMPORTANCE_WEIGHT: f32 = 0.3;
const SECTION_WEIGHT: f32 = 0.4;
const CLAUSE_WEIGHT: f32 = 0.3;

/// Words and phrases that carry legal force.
///
/// Negated forms ("shall not") match their base operator once.
pub const LEGAL_OPERATORS: &[&str] = &[
    "shall",
    "must",
    "may",
    "is liable",
    "breach",
    "default",
    "indemnify",
    "warrants",
    "agrees",
    "covenants",
    "notwithstanding",
    "provided that",
    "subject to",
];

const OPERATOR_BOOST: f32 = 0.1;
const MAX_OPERATOR_BOOST: f32 = 0.3;

/// Query side of the domain heuristics, prepared once per query
pub struct DomainQuery {
    words: Vec<String>,
    terms: HashSet<String>,
}

impl DomainQuery {
    pub fn new(query: &str, tokenizer: &LegalTokenizer) -> Self {
        Self {
            words: words(query).collect(),
            terms: tokenizer.tokenize(query).into_iter().collect(),
        }
    }
}

/// 0 without any query word on the section's keyword set, else `min(1, 0.5 + 0.25 * hits)`
pub fn section_relevance(query: &DomainQuery, section_type: SectionType) -> f32 {
    let hits = query
        .words
        .iter()
        .filter(|w| section_type.matches(w))
        .count();

    if hits == 0 {
        0.0
    } else {
        (0.5 + 0.25 * hits as f32).min(1.0)
    }
}

/// Share of query terms present in the text plus a bonus for legal operators
pub fn clause_similarity(query: &DomainQuery, text: &str, tokenizer: &LegalTokenizer) -> f32 {
    let overlap = if query.terms.is_empty() {
        0.0
    } else {
        let text_terms: HashSet<String> = tokenizer.tokenize(text).into_iter().collect();
        query.terms.intersection(&text_terms).count() as f32 / query.terms.len() as f32
    };

    let operators = count_operators(text);
    let boost = (operators as f32 * OPERATOR_BOOST).min(MAX_OPERATOR_BOOST);

    (overlap + boost).min(1.0)
}

/// Number of distinct legal operators in the text
pub fn count_operators(text: &str) -> usize {
    let normalised = format!(" {} ", words(text).collect::<Vec<_>>().join(" "));
    LEGAL_OPERATORS
        .iter()
        .filter(|op| normalised.contains(&format!(" {} ", op)))
        .count()
}

/// Legal-domain score of one chunk for a prepared query
pub fn legal_domain_score(query: &DomainQuery, chunk: &Chunk, tokenizer: &LegalTokenizer) -> f32 {
    let importance = chunk.legal_importance.clamp(0.0, 1.0);
    let section = section_relevance(query, chunk.section_type);
    let clause = clause_similarity(query, &chunk.text, tokenizer);

    importance * IMPORTANCE_WEIGHT + section * SECTION_WEIGHT + clause * CLAUSE_WEIGHT
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(text: &str) -> DomainQuery {
        DomainQuery::new(text, &LegalTokenizer::new())
    }

    #[test]
    fn test_section_relevance() {
        let q = query("What is the liability for damages?");
        assert_eq!(section_relevance(&q, SectionType::Liability), 1.0);
        assert_eq!(section_relevance(&q, SectionType::Financial), 0.0);

        let q = query("termination rules");
        assert!((section_relevance(&q, SectionType::Termination) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_operator_count() {
        assert_eq!(count_operators("The Supplier shall not assign."), 1);
        assert_eq!(count_operators("The party in breach is in default."), 2);
        assert_eq!(count_operators("Defaulting parties"), 0);
        assert_eq!(count_operators("Mayor of the town"), 0);
        assert_eq!(count_operators("SUBJECT TO clause 4, the party must pay."), 2);
    }

    #[test]
    fn test_clause_similarity_capped() {
        let tokenizer = LegalTokenizer::new();
        let q = query("supplier pays");
        let text = "The supplier pays; it shall, must, may and is liable, notwithstanding anything.";
        assert_eq!(clause_similarity(&q, text, &tokenizer), 1.0);
    }

    #[test]
    fn test_clause_similarity_operator_boost_capped() {
        let tokenizer = LegalTokenizer::new();
        let q = query("unrelated words");
        let text = "It shall, must, may, agrees and covenants.";
        assert!((clause_similarity(&q, text, &tokenizer) - 0.3).abs() < 1e-6);
    }
}
