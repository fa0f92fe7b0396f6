//! Embedding & Indexing
//!
//! Dense and sparse indexes over the chunk list of a knowledge base.
//! Architecture:
//! - EmbeddingProvider trait for abstraction
//! - FastEmbedProvider for local model embeddings, HashingEmbedder as the offline fallback
//! - Exact inner-product matrix for vector search
//! - BM25 over legal tokens for keyword search
//! - Batched, time-bounded embedding calls

mod batch;
mod keyword_index;
mod provider;
mod vector_index;

pub use batch::{embed_query, embed_texts, BatchItem, BatchProcessor, BatchResult, FailedBatch};
pub use keyword_index::{KeywordIndex, KeywordIndexError, KeywordSearchResult};
pub use provider::{EmbeddingError, EmbeddingProvider, FastEmbedProvider, HashingEmbedder};
pub use vector_index::{SearchResult, VectorIndex, VectorIndexError};
