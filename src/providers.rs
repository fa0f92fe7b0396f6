//! Provider selection with fallback
//!
//! Each model-backed signal resolves to one of three variants: the configured
//! provider, the configured fallback, or a neutral stand-in.

use crate::config::{EmbeddingConfig, RerankingConfig};
use crate::embedding::{EmbeddingProvider, FastEmbedProvider, HashingEmbedder};
use crate::rerank::{CrossEncoderScorer, LexicalOverlapScorer, NeutralScorer, RelevanceScorer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Which provider ended up serving a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderVariant {
    Primary,
    Fallback,
    Neutral,
}

impl fmt::Display for ProviderVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderVariant::Primary => write!(f, "primary"),
            ProviderVariant::Fallback => write!(f, "fallback"),
            ProviderVariant::Neutral => write!(f, "neutral"),
        }
    }
}

fn build_embedder(
    name: &str,
    config: &EmbeddingConfig,
) -> Result<Option<Arc<dyn EmbeddingProvider>>, String> {
    match name {
        "fastembed" => FastEmbedProvider::new(&config.model)
            .map(|p| Some(Arc::new(p) as Arc<dyn EmbeddingProvider>))
            .map_err(|e| e.to_string()),
        "hashing" => HashingEmbedder::new(config.dimension)
            .map(|p| Some(Arc::new(p) as Arc<dyn EmbeddingProvider>))
            .map_err(|e| e.to_string()),
        "none" => Ok(None),
        other => Err(format!("Unknown embedding provider: {}", other)),
    }
}

/// Resolve the embedding provider: configured, then fallback, then none
///
/// `None` disables the dense signal.
pub fn select_embedding_provider(
    config: &EmbeddingConfig,
) -> (ProviderVariant, Option<Arc<dyn EmbeddingProvider>>) {
    match build_embedder(&config.provider, config) {
        Ok(Some(provider)) => {
            info!(
                "Embedding provider: {} ({})",
                config.provider,
                provider.model_name()
            );
            return (ProviderVariant::Primary, Some(provider));
        }
        Ok(None) => {
            info!("Embedding provider disabled, dense signal off");
            return (ProviderVariant::Neutral, None);
        }
        Err(e) => warn!("Embedding provider {} unavailable: {}", config.provider, e),
    }

    match build_embedder(&config.fallback, config) {
        Ok(Some(provider)) => {
            warn!("Falling back to {} embeddings", config.fallback);
            (ProviderVariant::Fallback, Some(provider))
        }
        Ok(None) => {
            warn!("No embedding fallback configured, dense signal off");
            (ProviderVariant::Neutral, None)
        }
        Err(e) => {
            warn!(
                "Embedding fallback {} unavailable: {}; dense signal off",
                config.fallback, e
            );
            (ProviderVariant::Neutral, None)
        }
    }
}

fn build_scorer(
    name: &str,
    config: &RerankingConfig,
) -> Result<Option<Arc<dyn RelevanceScorer>>, String> {
    match name {
        "cross-encoder" => CrossEncoderScorer::new(&config.model)
            .map(|s| Some(Arc::new(s) as Arc<dyn RelevanceScorer>))
            .map_err(|e| e.to_string()),
        "lexical" => Ok(Some(Arc::new(LexicalOverlapScorer::new()))),
        "none" => Ok(None),
        other => Err(format!("Unknown relevance provider: {}", other)),
    }
}

/// Resolve the relevance scorer: configured, then fallback, then neutral
pub fn select_relevance_scorer(
    config: &RerankingConfig,
) -> (ProviderVariant, Arc<dyn RelevanceScorer>) {
    match build_scorer(&config.relevance_provider, config) {
        Ok(Some(scorer)) => {
            info!("Relevance scorer: {}", scorer.name());
            return (ProviderVariant::Primary, scorer);
        }
        Ok(None) => {
            info!("Relevance scoring disabled, using neutral scores");
            return (ProviderVariant::Neutral, Arc::new(NeutralScorer));
        }
        Err(e) => warn!(
            "Relevance provider {} unavailable: {}",
            config.relevance_provider, e
        ),
    }

    match build_scorer(&config.fallback, config) {
        Ok(Some(scorer)) => {
            warn!("Falling back to {} relevance scoring", scorer.name());
            (ProviderVariant::Fallback, scorer)
        }
        Ok(None) => {
            warn!("No relevance fallback configured, using neutral scores");
            (ProviderVariant::Neutral, Arc::new(NeutralScorer))
        }
        Err(e) => {
            warn!(
                "Relevance fallback {} unavailable: {}; using neutral scores",
                config.fallback, e
            );
            (ProviderVariant::Neutral, Arc::new(NeutralScorer))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedding(provider: &str, fallback: &str) -> EmbeddingConfig {
        EmbeddingConfig {
            provider: provider.to_string(),
            fallback: fallback.to_string(),
            ..EmbeddingConfig::default()
        }
    }

    fn reranking(provider: &str, fallback: &str) -> RerankingConfig {
        RerankingConfig {
            relevance_provider: provider.to_string(),
            fallback: fallback.to_string(),
            ..RerankingConfig::default()
        }
    }

    #[test]
    fn test_hashing_as_primary() {
        let (variant, provider) = select_embedding_provider(&embedding("hashing", "none"));
        assert_eq!(variant, ProviderVariant::Primary);
        assert_eq!(provider.unwrap().model_name(), "hashing");
    }

    #[test]
    fn test_unknown_provider_falls_back() {
        let (variant, provider) = select_embedding_provider(&embedding("word2vec", "hashing"));
        assert_eq!(variant, ProviderVariant::Fallback);
        assert!(provider.is_some());
    }

    #[test]
    fn test_no_fallback_is_neutral() {
        let (variant, provider) = select_embedding_provider(&embedding("word2vec", "none"));
        assert_eq!(variant, ProviderVariant::Neutral);
        assert!(provider.is_none());

        let (variant, _) = select_embedding_provider(&embedding("none", "hashing"));
        assert_eq!(variant, ProviderVariant::Neutral);
    }

    #[test]
    fn test_scorer_selection() {
        let (variant, scorer) = select_relevance_scorer(&reranking("lexical", "none"));
        assert_eq!(variant, ProviderVariant::Primary);
        assert_eq!(scorer.name(), "lexical");

        let (variant, scorer) = select_relevance_scorer(&reranking("oracle", "lexical"));
        assert_eq!(variant, ProviderVariant::Fallback);
        assert_eq!(scorer.name(), "lexical");

        let (variant, scorer) = select_relevance_scorer(&reranking("oracle", "bogus"));
        assert_eq!(variant, ProviderVariant::Neutral);
        assert_eq!(scorer.name(), "neutral");
    }

    #[test]
    #[ignore] // Downloads the cross-encoder model
    fn test_cross_encoder_primary() {
        let (variant, scorer) = select_relevance_scorer(&RerankingConfig::default());
        assert_eq!(variant, ProviderVariant::Primary);
        assert_ne!(scorer.name(), "neutral");
    }
}
