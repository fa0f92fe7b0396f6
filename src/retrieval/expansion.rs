//! Query expansion with legal vocabulary

use crate::chunking::{SectionType, CONTRACT_SECTIONS};
use crate::tokenizer::words;

/// Appended to every expanded query
const GENERIC_LEGAL_TERMS: &str = "agreement clause provision obligation";

fn intent_terms(section_type: SectionType) -> &'static str {
    match section_type {
        SectionType::Financial => "payment fee invoice compensation amount",
        SectionType::Liability => "liability indemnification damages limitation exposure",
        SectionType::Termination => "termination expiry cancellation notice renewal",
        SectionType::Confidentiality => "confidential disclosure proprietary secret",
        SectionType::IntellectualProperty => "intellectual property license ownership copyright",
        SectionType::DisputeResolution => "dispute arbitration jurisdiction governing law",
        SectionType::LegalProvision => "article section provision regulation",
        SectionType::General => "",
    }
}

/// Append intent vocabulary for every section type the query hits, then generic
/// legal terms. Deterministic; the original query is always the prefix.
pub fn generate_expanded_query(query: &str) -> String {
    let query_words: Vec<String> = words(query).collect();

    let mut parts = vec![query.trim().to_string()];
    for section_type in CONTRACT_SECTIONS {
        if query_words.iter().any(|w| section_type.matches(w)) {
            parts.push(intent_terms(section_type).to_string());
        }
    }
    parts.push(GENERIC_LEGAL_TERMS.to_string());

    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expansion_by_intent() {
        let expanded = generate_expanded_query("When can I terminate?");
        assert!(expanded.starts_with("When can I terminate?"));
        assert!(expanded.contains("cancellation"));
        assert!(expanded.ends_with("agreement clause provision obligation"));
        assert!(!expanded.contains("arbitration"));
    }

    #[test]
    fn test_expansion_multiple_intents() {
        let expanded = generate_expanded_query("payment liability");
        assert!(expanded.contains("invoice"));
        assert!(expanded.contains("indemnification"));
    }

    #[test]
    fn test_expansion_without_intent() {
        assert_eq!(
            generate_expanded_query("hello world"),
            "hello world agreement clause provision obligation"
        );
    }

    #[test]
    fn test_expansion_is_deterministic() {
        assert_eq!(
            generate_expanded_query("fees and damages"),
            generate_expanded_query("fees and damages")
        );
    }
}
