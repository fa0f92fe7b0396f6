use crate::config::{Config, SCHEMA_VERSION};
use crate::error::{LexragError, Result, ValidationError};
use regex::Regex;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration, collecting every problem before failing
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_chunking(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_indexing(config, &mut errors);
        Self::validate_retrieval(config, &mut errors);
        Self::validate_reranking(config, &mut errors);
        Self::validate_memory(config, &mut errors);
        Self::validate_entities(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(LexragError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != SCHEMA_VERSION {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_chunking(config: &Config, errors: &mut Vec<ValidationError>) {
        let c = &config.chunking;

        if c.sub_chunk_chars == 0 {
            errors.push(ValidationError::new(
                "chunking.sub_chunk_chars",
                "Sub-chunk size must be greater than 0",
            ));
        }

        if c.sub_chunk_overlap >= c.sub_chunk_chars {
            errors.push(ValidationError::new(
                "chunking.sub_chunk_overlap",
                format!(
                    "Overlap ({}) must be smaller than the sub-chunk size ({})",
                    c.sub_chunk_overlap, c.sub_chunk_chars
                ),
            ));
        }

        if c.max_section_chars == 0 {
            errors.push(ValidationError::new(
                "chunking.max_section_chars",
                "Maximum section size must be greater than 0",
            ));
        }

        if c.window_min_chars == 0 || c.window_min_chars > c.window_max_chars {
            errors.push(ValidationError::new(
                "chunking.window_min_chars",
                format!(
                    "Window bounds must satisfy 0 < min <= max, got {}..{}",
                    c.window_min_chars, c.window_max_chars
                ),
            ));
        }

        if !(0.0..1.0).contains(&c.window_overlap_ratio) {
            errors.push(ValidationError::new(
                "chunking.window_overlap_ratio",
                format!(
                    "Overlap ratio must be in [0.0, 1.0), got {}",
                    c.window_overlap_ratio
                ),
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        let e = &config.embedding;

        let valid_providers = ["fastembed", "hashing", "none"];
        if !valid_providers.contains(&e.provider.as_str()) {
            errors.push(ValidationError::new(
                "embedding.provider",
                format!(
                    "Provider must be one of {:?}, got '{}'",
                    valid_providers, e.provider
                ),
            ));
        }

        let valid_fallbacks = ["hashing", "none"];
        if !valid_fallbacks.contains(&e.fallback.as_str()) {
            errors.push(ValidationError::new(
                "embedding.fallback",
                format!(
                    "Fallback must be one of {:?}, got '{}'",
                    valid_fallbacks, e.fallback
                ),
            ));
        }

        if e.batch_size == 0 {
            errors.push(ValidationError::new(
                "embedding.batch_size",
                "Batch size must be greater than 0",
            ));
        }

        if e.dimension == 0 {
            errors.push(ValidationError::new(
                "embedding.dimension",
                "Vector dimension must be greater than 0",
            ));
        }

        if e.provider == "fastembed" && e.model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "Model name cannot be empty",
            ));
        }

        if e.timeout_ms == 0 {
            errors.push(ValidationError::new(
                "embedding.timeout_ms",
                "Timeout must be greater than 0",
            ));
        }
    }

    fn validate_indexing(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.indexing.bm25_k1 <= 0.0 {
            errors.push(ValidationError::new(
                "indexing.bm25_k1",
                format!("k1 must be positive, got {}", config.indexing.bm25_k1),
            ));
        }

        if !(0.0..=1.0).contains(&config.indexing.bm25_b) {
            errors.push(ValidationError::new(
                "indexing.bm25_b",
                format!("b must be between 0.0 and 1.0, got {}", config.indexing.bm25_b),
            ));
        }
    }

    fn validate_retrieval(config: &Config, errors: &mut Vec<ValidationError>) {
        let r = &config.retrieval;

        for (path, weight) in [
            ("retrieval.dense_weight", r.dense_weight),
            ("retrieval.sparse_weight", r.sparse_weight),
        ] {
            if !(0.0..=1.0).contains(&weight) {
                errors.push(ValidationError::new(
                    path,
                    format!("Weight must be between 0.0 and 1.0, got {}", weight),
                ));
            }
        }

        if r.dense_weight + r.sparse_weight <= 0.0 {
            errors.push(ValidationError::new(
                "retrieval.dense_weight",
                "At least one fusion weight must be positive",
            ));
        }

        if r.final_top_n == 0 {
            errors.push(ValidationError::new(
                "retrieval.final_top_n",
                "Final result count must be greater than 0",
            ));
        }

        if r.rerank_budget < r.final_top_n {
            errors.push(ValidationError::new(
                "retrieval.rerank_budget",
                format!(
                    "Rerank budget ({}) must be at least the final result count ({})",
                    r.rerank_budget, r.final_top_n
                ),
            ));
        }

        if r.dense_top_k == 0 || r.sparse_top_k == 0 {
            errors.push(ValidationError::new(
                "retrieval.dense_top_k",
                "Per-index top-k must be greater than 0",
            ));
        }
    }

    fn validate_reranking(config: &Config, errors: &mut Vec<ValidationError>) {
        let r = &config.reranking;

        let valid_providers = ["cross-encoder", "lexical", "none"];
        if !valid_providers.contains(&r.relevance_provider.as_str()) {
            errors.push(ValidationError::new(
                "reranking.relevance_provider",
                format!(
                    "Provider must be one of {:?}, got '{}'",
                    valid_providers, r.relevance_provider
                ),
            ));
        }

        let valid_fallbacks = ["lexical", "none"];
        if !valid_fallbacks.contains(&r.fallback.as_str()) {
            errors.push(ValidationError::new(
                "reranking.fallback",
                format!(
                    "Fallback must be one of {:?}, got '{}'",
                    valid_fallbacks, r.fallback
                ),
            ));
        }

        if r.max_passage_chars == 0 {
            errors.push(ValidationError::new(
                "reranking.max_passage_chars",
                "Passage length bound must be greater than 0",
            ));
        }

        if r.timeout_ms == 0 {
            errors.push(ValidationError::new(
                "reranking.timeout_ms",
                "Timeout must be greater than 0",
            ));
        }
    }

    fn validate_memory(config: &Config, errors: &mut Vec<ValidationError>) {
        let m = &config.memory;

        if m.max_entries == 0 || m.trim_to >= m.max_entries {
            errors.push(ValidationError::new(
                "memory.trim_to",
                format!(
                    "Trim target ({}) must be smaller than max entries ({})",
                    m.trim_to, m.max_entries
                ),
            ));
        }

        if !(m.feedback_alpha > 0.0 && m.feedback_alpha <= 1.0) {
            errors.push(ValidationError::new(
                "memory.feedback_alpha",
                format!("Alpha must be in (0.0, 1.0], got {}", m.feedback_alpha),
            ));
        }

        if !(0.0..=1.0).contains(&m.feedback_weight) {
            errors.push(ValidationError::new(
                "memory.feedback_weight",
                format!(
                    "Feedback weight must be between 0.0 and 1.0, got {}",
                    m.feedback_weight
                ),
            ));
        }
    }

    fn validate_entities(config: &Config, errors: &mut Vec<ValidationError>) {
        for (idx, pattern) in config.entities.pattern.iter().enumerate() {
            if let Err(e) = Regex::new(&pattern.pattern) {
                errors.push(ValidationError::new(
                    format!("entities.pattern[{}]", idx),
                    format!("Invalid regex for '{}': {}", pattern.type_name, e),
                ));
            }

            if !(0.0..=1.0).contains(&pattern.confidence) {
                errors.push(ValidationError::new(
                    format!("entities.pattern[{}].confidence", idx),
                    format!("Confidence must be between 0.0 and 1.0, got {}", pattern.confidence),
                ));
            }
        }
    }
}
