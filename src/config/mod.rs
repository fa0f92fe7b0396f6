//! Configuration management for lexrag
//!
//! Loads, validates and overrides the engine configuration. Every tunable of the
//! chunker, the two indexes, the orchestrator and the reranking pipeline lives here
//! so deployments can be adjusted without a rebuild.

use crate::entities::{default_entity_patterns, EntityPatternConfig};
use crate::error::{LexragError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

/// Schema version understood by this build
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub indexing: IndexingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub reranking: RerankingConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub entities: EntitiesConfig,
    #[serde(default)]
    pub profiles: HashMap<String, ProfileOverrides>,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Chunker thresholds (all lengths in characters)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Sections longer than this are split into sub-chunks
    pub max_section_chars: usize,
    /// Sub-chunk window size
    pub sub_chunk_chars: usize,
    /// Overlap between consecutive sub-chunks
    pub sub_chunk_overlap: usize,
    /// Contract sections shorter than this are dropped
    pub min_section_chars: usize,
    /// Windows, statute pieces and sub-chunks shorter than this are dropped
    pub min_fragment_chars: usize,
    /// Lower clamp of the adaptive generic window
    pub window_min_chars: usize,
    /// Upper clamp of the adaptive generic window
    pub window_max_chars: usize,
    /// Fraction of the generic window shared with the next window
    pub window_overlap_ratio: f32,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_section_chars: 1000,
            sub_chunk_chars: 500,
            sub_chunk_overlap: 100,
            min_section_chars: 100,
            min_fragment_chars: 50,
            window_min_chars: 400,
            window_max_chars: 800,
            window_overlap_ratio: 0.25,
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// "fastembed", "hashing" or "none"
    pub provider: String,
    /// Used when the primary provider cannot be initialised: "hashing" or "none"
    pub fallback: String,
    /// Model name for the fastembed provider
    pub model: String,
    /// Vector dimension of the hashing embedder
    pub dimension: usize,
    /// Chunks per embedding call during index builds
    pub batch_size: usize,
    /// Upper bound for one embedding call
    pub timeout_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "fastembed".to_string(),
            fallback: "hashing".to_string(),
            model: "all-MiniLM-L6-v2".to_string(),
            dimension: 384,
            batch_size: 16,
            timeout_ms: 30_000,
        }
    }
}

/// Sparse index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingConfig {
    /// BM25 term-frequency saturation
    pub bm25_k1: f32,
    /// BM25 length normalisation
    pub bm25_b: f32,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            bm25_k1: 1.5,
            bm25_b: 0.75,
        }
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Candidates requested from the dense index
    pub dense_top_k: usize,
    /// Candidates requested from the sparse index
    pub sparse_top_k: usize,
    /// Fusion weight of the dense score
    pub dense_weight: f32,
    /// Fusion weight of the BM25 score
    pub sparse_weight: f32,
    /// Fused candidates handed to reranking. Latency policy, not an algorithmic limit.
    pub rerank_budget: usize,
    /// Results returned to the caller
    pub final_top_n: usize,
    /// Queries with fewer non-blank characters are rejected
    pub min_query_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            dense_top_k: 20,
            sparse_top_k: 20,
            dense_weight: 0.6,
            sparse_weight: 0.4,
            rerank_budget: 10,
            final_top_n: 3,
            min_query_chars: 3,
        }
    }
}

/// Reranking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankingConfig {
    /// "cross-encoder", "lexical" or "none"
    pub relevance_provider: String,
    /// Used when the primary scorer cannot be initialised: "lexical" or "none"
    pub fallback: String,
    /// Cross-encoder model name
    pub model: String,
    /// Passages are cut to this many characters before pairwise scoring
    pub max_passage_chars: usize,
    /// Upper bound for one pairwise scoring call
    pub timeout_ms: u64,
    /// Candidates scored by the relevance model in fast mode
    pub fast_relevance_limit: usize,
}

impl Default for RerankingConfig {
    fn default() -> Self {
        Self {
            relevance_provider: "cross-encoder".to_string(),
            fallback: "lexical".to_string(),
            model: "bge-reranker-base".to_string(),
            max_passage_chars: 512,
            timeout_ms: 10_000,
            fast_relevance_limit: 10,
        }
    }
}

/// Conversation memory and feedback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Memory log is trimmed once it grows past this many entries
    pub max_entries: usize,
    /// Entries kept after a trim
    pub trim_to: usize,
    /// Weight of the newly observed score in the feedback moving average
    pub feedback_alpha: f32,
    /// Weight of the feedback score in the final score
    pub feedback_weight: f32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_entries: 50,
            trim_to: 25,
            feedback_alpha: 0.3,
            feedback_weight: 0.2,
        }
    }
}

/// Entity extraction patterns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitiesConfig {
    #[serde(default = "default_entity_patterns")]
    pub pattern: Vec<EntityPatternConfig>,
}

impl Default for EntitiesConfig {
    fn default() -> Self {
        Self {
            pattern: default_entity_patterns(),
        }
    }
}

/// Profile-specific configuration overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerank_budget: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_top_n: Option<usize>,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(LexragError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| LexragError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| LexragError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Load configuration with a specific profile applied
    pub fn load_with_profile(path: &Path, profile: &str) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_profile(profile)?;
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Apply a profile's overrides to the configuration
    pub fn apply_profile(&mut self, profile: &str) -> Result<()> {
        let overrides = self
            .profiles
            .get(profile)
            .cloned()
            .ok_or_else(|| LexragError::Config(format!("Unknown profile: {}", profile)))?;

        if let Some(provider) = overrides.embedding_provider {
            self.embedding.provider = provider;
        }
        if let Some(model) = overrides.embedding_model {
            self.embedding.model = model;
        }
        if let Some(provider) = overrides.relevance_provider {
            self.reranking.relevance_provider = provider;
        }
        if let Some(budget) = overrides.rerank_budget {
            self.retrieval.rerank_budget = budget;
        }
        if let Some(top_n) = overrides.final_top_n {
            self.retrieval.final_top_n = top_n;
        }
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: LEXRAG_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("LEXRAG_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "EMBEDDING__PROVIDER" => {
                self.embedding.provider = value.to_string();
            }
            "EMBEDDING__MODEL" => {
                self.embedding.model = value.to_string();
            }
            "RERANKING__RELEVANCE_PROVIDER" => {
                self.reranking.relevance_provider = value.to_string();
            }
            "RERANKING__MODEL" => {
                self.reranking.model = value.to_string();
            }
            "RETRIEVAL__RERANK_BUDGET" => {
                self.retrieval.rerank_budget = parse_usize(path, value)?;
            }
            "RETRIEVAL__FINAL_TOP_N" => {
                self.retrieval.final_top_n = parse_usize(path, value)?;
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| LexragError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("lexrag").join("config.toml"))
    }
}

fn parse_usize(path: &str, value: &str) -> Result<usize> {
    value.parse().map_err(|_| LexragError::InvalidConfigValue {
        path: path.to_string(),
        message: format!("Cannot parse '{}' as an unsigned integer", value),
    })
}

impl Default for Config {
    fn default() -> Self {
        let mut profiles = HashMap::new();
        profiles.insert(
            "offline".to_string(),
            ProfileOverrides {
                embedding_provider: Some("hashing".to_string()),
                relevance_provider: Some("lexical".to_string()),
                ..ProfileOverrides::default()
            },
        );

        Self {
            meta: MetaConfig {
                schema_version: SCHEMA_VERSION.to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            chunking: ChunkingConfig::default(),
            embedding: EmbeddingConfig::default(),
            indexing: IndexingConfig::default(),
            retrieval: RetrievalConfig::default(),
            reranking: RerankingConfig::default(),
            memory: MemoryConfig::default(),
            entities: EntitiesConfig::default(),
            profiles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        let mut config = Config::default();
        config.retrieval.final_top_n = 5;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.retrieval.final_top_n, 5);
        assert_eq!(loaded.entities.pattern.len(), config.entities.pattern.len());
    }

    #[test]
    fn test_partial_file_uses_section_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            "[_meta]\nschema_version = \"1.0.0\"\n\n[indexing]\nbm25_k1 = 1.2\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.indexing.bm25_k1, 1.2);
        assert_eq!(config.indexing.bm25_b, 0.75);
        assert_eq!(config.retrieval.rerank_budget, 10);
        assert!(!config.entities.pattern.is_empty());
    }

    #[test]
    fn test_missing_file() {
        let result = Config::load(Path::new("/nonexistent/lexrag/config.toml"));
        assert!(matches!(result, Err(LexragError::ConfigNotFound { .. })));
    }

    #[test]
    fn test_apply_profile() {
        let mut config = Config::default();
        config.apply_profile("offline").unwrap();
        assert_eq!(config.embedding.provider, "hashing");
        assert_eq!(config.reranking.relevance_provider, "lexical");

        assert!(config.apply_profile("missing").is_err());
    }
}
