//! Multi-stage reranking of fused candidates
//!
//! One pipeline parameterised by [`PipelineMode`]: a pairwise relevance stage,
//! legal-domain heuristics, a multi-criteria blend and a weighted ensemble.

mod criteria;
mod domain;
mod pipeline;
mod relevance;

pub use criteria::{doc_type_weight, multi_criteria_score, precedent, recency};
pub use domain::{
    clause_similarity, count_operators, legal_domain_score, section_relevance, DomainQuery,
    LEGAL_OPERATORS,
};
pub use pipeline::{PipelineMode, RerankOutcome, RerankPipeline, NEUTRAL_RELEVANCE};
pub use relevance::{
    sigmoid, CrossEncoderScorer, LexicalOverlapScorer, NeutralScorer, RelevanceScorer,
    RerankError,
};
