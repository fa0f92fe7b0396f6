/// Batched, time-bounded embedding for index builds and queries
use super::{EmbeddingError, EmbeddingProvider};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Item to be embedded (chunk offset with its text)
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub offset: usize,
    pub text: String,
}

/// A batch whose embedding call failed or timed out
#[derive(Debug, Clone)]
pub struct FailedBatch {
    pub offsets: Vec<usize>,
    pub reason: String,
}

/// Result of batch processing
#[derive(Debug, Default)]
pub struct BatchResult {
    /// Vectors in input order, keyed by chunk offset
    pub embedded: Vec<(usize, Vec<f32>)>,
    pub failed: Vec<FailedBatch>,
    pub duration_ms: u64,
}

impl BatchResult {
    pub fn processed(&self) -> usize {
        self.embedded.len()
    }

    pub fn failed_items(&self) -> usize {
        self.failed.iter().map(|b| b.offsets.len()).sum()
    }
}

/// Batch processor for embedding generation
///
/// Splits the input into batches of `batch_size`, runs each provider call on
/// the blocking pool and bounds it with `timeout`. A failed batch never aborts
/// the run; its items are reported in [`BatchResult::failed`].
pub struct BatchProcessor {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    timeout: Duration,
}

impl BatchProcessor {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, batch_size: usize, timeout: Duration) -> Self {
        Self {
            provider,
            batch_size: batch_size.max(1),
            timeout,
        }
    }

    /// Embed every item, batch by batch
    pub async fn process(&self, items: Vec<BatchItem>) -> BatchResult {
        let start = Instant::now();
        let total = items.len();

        info!(
            "Embedding {} chunks with {} (batch size {})",
            total,
            self.provider.model_name(),
            self.batch_size
        );

        let mut result = BatchResult::default();
        for batch in items.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|item| item.text.clone()).collect();
            let offsets: Vec<usize> = batch.iter().map(|item| item.offset).collect();

            match embed_texts(self.provider.clone(), texts, self.timeout).await {
                Ok(vectors) => {
                    debug!("Embedded batch of {} chunks", vectors.len());
                    result.embedded.extend(offsets.into_iter().zip(vectors));
                }
                Err(e) => {
                    warn!("Failed to embed batch of {} chunks: {}", offsets.len(), e);
                    result.failed.push(FailedBatch {
                        offsets,
                        reason: e.to_string(),
                    });
                }
            }
        }

        result.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Embedding complete: {} processed, {} failed, {}ms",
            result.processed(),
            result.failed_items(),
            result.duration_ms
        );

        result
    }
}

/// Embed a list of texts on the blocking pool, bounded by `timeout`
pub async fn embed_texts(
    provider: Arc<dyn EmbeddingProvider>,
    texts: Vec<String>,
    timeout: Duration,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let expected = texts.len();
    let task = tokio::task::spawn_blocking(move || provider.embed_batch(&texts));

    let vectors = match tokio::time::timeout(timeout, task).await {
        Err(_) => return Err(EmbeddingError::Timeout(timeout.as_millis() as u64)),
        Ok(Err(join_error)) => {
            return Err(EmbeddingError::GenerationError(format!(
                "Embedding task failed: {}",
                join_error
            )))
        }
        Ok(Ok(result)) => result?,
    };

    if vectors.len() != expected {
        return Err(EmbeddingError::GenerationError(format!(
            "Embedding count mismatch: expected {}, got {}",
            expected,
            vectors.len()
        )));
    }

    Ok(vectors)
}

/// Embed a single query text, bounded by `timeout`
pub async fn embed_query(
    provider: Arc<dyn EmbeddingProvider>,
    text: &str,
    timeout: Duration,
) -> Result<Vec<f32>, EmbeddingError> {
    let mut vectors = embed_texts(provider, vec![text.to_string()], timeout).await?;
    vectors
        .pop()
        .ok_or_else(|| EmbeddingError::GenerationError("No embeddings generated".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbedder;

    /// Fails every batch containing a marker text
    struct FlakyProvider {
        inner: HashingEmbedder,
    }

    impl EmbeddingProvider for FlakyProvider {
        fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.inner.embed(text)
        }

        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            if texts.iter().any(|t| t.contains("poison")) {
                return Err(EmbeddingError::GenerationError("model crashed".to_string()));
            }
            self.inner.embed_batch(texts)
        }

        fn dimension(&self) -> usize {
            self.inner.dimension()
        }

        fn model_name(&self) -> &str {
            "flaky"
        }
    }

    struct SlowProvider;

    impl EmbeddingProvider for SlowProvider {
        fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            std::thread::sleep(Duration::from_millis(300));
            Ok(vec![1.0])
        }

        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            texts.iter().map(|t| self.embed(t)).collect()
        }

        fn dimension(&self) -> usize {
            1
        }

        fn model_name(&self) -> &str {
            "slow"
        }
    }

    fn items(texts: &[&str]) -> Vec<BatchItem> {
        texts
            .iter()
            .enumerate()
            .map(|(offset, text)| BatchItem {
                offset,
                text: text.to_string(),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_batch_processing() {
        let provider = Arc::new(HashingEmbedder::new(32).unwrap());
        let processor = BatchProcessor::new(provider, 2, Duration::from_secs(5));

        let result = processor
            .process(items(&["payment terms", "liability cap", "termination notice"]))
            .await;

        assert_eq!(result.processed(), 3);
        assert_eq!(result.failed_items(), 0);
        let offsets: Vec<usize> = result.embedded.iter().map(|(o, _)| *o).collect();
        assert_eq!(offsets, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_failed_batch_is_isolated() {
        let provider = Arc::new(FlakyProvider {
            inner: HashingEmbedder::new(32).unwrap(),
        });
        let processor = BatchProcessor::new(provider, 2, Duration::from_secs(5));

        let result = processor
            .process(items(&["one text", "two text", "poison text", "four text", "five text"]))
            .await;

        // Batches: [0, 1] ok, [2, 3] fails, [4] ok
        assert_eq!(result.processed(), 3);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].offsets, vec![2, 3]);
        assert!(result.failed[0].reason.contains("model crashed"));
    }

    #[tokio::test]
    async fn test_timeout_reported() {
        let provider = Arc::new(SlowProvider);
        let err = embed_query(provider, "slow query", Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, EmbeddingError::Timeout(20)));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let provider = Arc::new(HashingEmbedder::new(8).unwrap());
        let processor = BatchProcessor::new(provider, 16, Duration::from_secs(1));
        let result = processor.process(Vec::new()).await;
        assert_eq!(result.processed(), 0);
        assert!(result.failed.is_empty());
    }
}
