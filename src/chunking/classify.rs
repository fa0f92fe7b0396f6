//! Section classification and legal importance scoring

use super::SectionType;
use crate::tokenizer::words;

/// Section types a contract paragraph can be classified into, in tie-break order
pub const CONTRACT_SECTIONS: [SectionType; 6] = [
    SectionType::Liability,
    SectionType::Financial,
    SectionType::Termination,
    SectionType::Confidentiality,
    SectionType::IntellectualProperty,
    SectionType::DisputeResolution,
];

/// Phrases that signal elevated legal risk; each distinct hit adds 0.1 importance
pub const RISK_TERMS: &[&str] = &[
    "unlimited",
    "without notice",
    "waive",
    "irrevocable",
    "sole discretion",
    "perpetual",
    "automatic renewal",
    "liquidated damages",
    "penalty",
    "non-refundable",
    "indemnify",
    "at any time",
];

const RISK_TERM_WEIGHT: f32 = 0.1;

impl SectionType {
    /// Keyword stems for this section type. A word matches when it starts with a stem.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            SectionType::Financial => &[
                "payment", "pay", "fee", "price", "cost", "invoice", "compensat", "amount",
                "financ", "expense", "refund", "tax",
            ],
            SectionType::Liability => &[
                "liabil", "liable", "indemn", "damage", "loss", "exposure", "negligen", "harm",
                "warrant",
            ],
            SectionType::Termination => &[
                "terminat", "cancel", "expir", "notice", "renewal", "dissol",
            ],
            SectionType::Confidentiality => &[
                "confidential", "disclos", "secret", "proprietar", "privacy", "non-disclosure",
            ],
            SectionType::IntellectualProperty => &[
                "intellectual", "property", "copyright", "patent", "trademark", "licens",
                "ownership",
            ],
            SectionType::DisputeResolution => &[
                "dispute", "arbitrat", "court", "jurisdiction", "governing", "mediat", "litigat",
                "claim",
            ],
            SectionType::LegalProvision => &[
                "article", "section", "provision", "statut", "regulat", "law", "requirement",
                "complian", "penalt",
            ],
            SectionType::General => &[],
        }
    }

    /// Whether a lowercase word hits this section's keyword set
    pub fn matches(&self, word: &str) -> bool {
        self.keywords().iter().any(|stem| word.starts_with(stem))
    }

    /// Importance before risk-term adjustments
    pub fn base_importance(&self) -> f32 {
        match self {
            SectionType::Liability => 0.9,
            SectionType::Financial => 0.8,
            SectionType::Termination => 0.8,
            SectionType::LegalProvision => 0.8,
            SectionType::DisputeResolution => 0.7,
            SectionType::IntellectualProperty => 0.7,
            SectionType::Confidentiality => 0.6,
            SectionType::General => 0.5,
        }
    }
}

/// Pick the candidate section type with the most keyword hits.
///
/// Ties go to the earlier candidate; no hits at all means `General`.
pub fn classify_section(text: &str, candidates: &[SectionType]) -> SectionType {
    let tokens: Vec<String> = words(text).collect();

    let mut best = SectionType::General;
    let mut best_hits = 0;
    for section in candidates {
        let hits = tokens.iter().filter(|t| section.matches(t)).count();
        if hits > best_hits {
            best = *section;
            best_hits = hits;
        }
    }
    best
}

/// Base weight of the section type plus 0.1 per distinct risk term, capped at 1.0
pub fn legal_importance(section_type: SectionType, text: &str) -> f32 {
    let lowered = text.to_lowercase();
    let risk_hits = RISK_TERMS
        .iter()
        .filter(|term| lowered.contains(*term))
        .count();

    (section_type.base_importance() + risk_hits as f32 * RISK_TERM_WEIGHT).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_liability() {
        let text = "The Supplier shall be liable for all damages and losses caused by negligence.";
        assert_eq!(
            classify_section(text, &CONTRACT_SECTIONS),
            SectionType::Liability
        );
    }

    #[test]
    fn test_classify_termination_over_financial() {
        let text = "Either party may terminate upon thirty days written notice. \
                    Upon termination all outstanding fees are payable.";
        assert_eq!(
            classify_section(text, &CONTRACT_SECTIONS),
            SectionType::Termination
        );
    }

    #[test]
    fn test_classify_general() {
        let text = "This document was prepared in the city of Springfield.";
        assert_eq!(classify_section(text, &CONTRACT_SECTIONS), SectionType::General);
    }

    #[test]
    fn test_importance_base() {
        assert!((legal_importance(SectionType::General, "plain words") - 0.5).abs() < 1e-6);
        assert!((legal_importance(SectionType::Confidentiality, "keep it secret") - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_importance_risk_terms_capped() {
        let text = "Unlimited liability, terminable without notice, irrevocable and perpetual.";
        let score = legal_importance(SectionType::Financial, text);
        assert!((score - 1.0).abs() < 1e-6);

        let one_term = legal_importance(SectionType::Termination, "may end without notice");
        assert!((one_term - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_distinct_terms_counted_once() {
        let text = "waive, waive, waive";
        let score = legal_importance(SectionType::General, text);
        assert!((score - 0.6).abs() < 1e-6);
    }
}
