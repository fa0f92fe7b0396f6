//! Owner of the current knowledge base

use super::{KnowledgeBase, KnowledgeBaseBuilder, KnowledgeBaseStats};
use crate::document::Document;
use crate::error::Result;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Holds the live knowledge base and replaces it after rebuilds
///
/// Readers clone the `Arc` and release the lock immediately, so a swap never
/// waits for in-flight queries.
pub struct KnowledgeBaseService {
    builder: KnowledgeBaseBuilder,
    current: RwLock<Option<Arc<KnowledgeBase>>>,
}

impl KnowledgeBaseService {
    pub fn new(builder: KnowledgeBaseBuilder) -> Self {
        Self {
            builder,
            current: RwLock::new(None),
        }
    }

    /// Build a new knowledge base and make it current
    pub async fn build(&self, documents: Vec<Document>) -> Result<Arc<KnowledgeBase>> {
        let knowledge_base = Arc::new(self.builder.build(documents).await?);
        self.swap(knowledge_base.clone()).await;
        Ok(knowledge_base)
    }

    /// Replace the current knowledge base, returning the previous one
    pub async fn swap(&self, knowledge_base: Arc<KnowledgeBase>) -> Option<Arc<KnowledgeBase>> {
        let mut current = self.current.write().await;
        tracing::debug!(
            "Swapping in knowledge base with {} chunks",
            knowledge_base.chunks.len()
        );
        current.replace(knowledge_base)
    }

    /// Current knowledge base, `None` before the first build
    pub async fn snapshot(&self) -> Option<Arc<KnowledgeBase>> {
        self.current.read().await.clone()
    }

    pub async fn stats(&self) -> Option<KnowledgeBaseStats> {
        self.snapshot().await.map(|kb| kb.stats())
    }
}
