/// Exact inner-product vector index over an in-memory matrix
use ndarray::{Array2, ArrayView1};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VectorIndexError {
    #[error("Invalid dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Vector for chunk {0} contains non-finite values")]
    NonFinite(usize),

    #[error("Insert failed: {0}")]
    InsertError(String),
}

/// Search result with chunk offset and similarity score
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Position of the chunk in the knowledge base chunk list
    pub offset: usize,
    /// Inner product of the normalised vectors (cosine similarity)
    pub score: f32,
}

/// Dense index
///
/// Row `i` of the matrix holds the L2-normalised vector of chunk `rows[i]`.
/// Search is an exact matrix-vector product followed by a top-k selection.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    matrix: Array2<f32>,
    rows: Vec<usize>,
    dimension: usize,
}

impl VectorIndex {
    /// Create an empty index
    pub fn new(dimension: usize) -> Self {
        Self {
            matrix: Array2::zeros((0, dimension)),
            rows: Vec::new(),
            dimension,
        }
    }

    /// Insert the vector of the chunk at `offset`
    pub fn insert(&mut self, offset: usize, vector: &[f32]) -> Result<(), VectorIndexError> {
        if vector.len() != self.dimension {
            return Err(VectorIndexError::InvalidDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(VectorIndexError::NonFinite(offset));
        }

        let normalised = normalise(vector);
        self.matrix
            .push_row(ArrayView1::from(&normalised))
            .map_err(|e| VectorIndexError::InsertError(e.to_string()))?;
        self.rows.push(offset);

        Ok(())
    }

    /// Top `k` chunks by inner product with the normalised query
    ///
    /// Results are sorted by score descending, ties broken by chunk offset.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>, VectorIndexError> {
        if query.len() != self.dimension {
            return Err(VectorIndexError::InvalidDimension {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if self.rows.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query = normalise(query);
        let scores = self.matrix.dot(&ArrayView1::from(&query));

        let mut results: Vec<SearchResult> = scores
            .iter()
            .zip(self.rows.iter())
            .map(|(score, offset)| SearchResult {
                offset: *offset,
                score: *score,
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.offset.cmp(&b.offset))
        });
        results.truncate(k);

        Ok(results)
    }

    /// Chunk offsets in row order
    pub fn offsets(&self) -> &[usize] {
        &self.rows
    }

    /// Get the number of vectors in the index
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if index is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get vector dimension
    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

fn normalise(vector: &[f32]) -> Vec<f32> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter().map(|x| x / norm).collect()
    } else {
        vector.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(dim: usize, i: usize, value: f32) -> Vec<f32> {
        let mut v = vec![0.0; dim];
        v[i] = value;
        v
    }

    #[test]
    fn test_index_creation() {
        let index = VectorIndex::new(384);
        assert_eq!(index.dimension(), 384);
        assert_eq!(index.len(), 0);
        assert!(index.is_empty());
    }

    #[test]
    fn test_insert_and_search() {
        let mut index = VectorIndex::new(8);

        let mut vec3 = vec![0.0; 8];
        vec3[0] = 0.9;
        vec3[1] = 0.1;

        index.insert(0, &axis(8, 0, 1.0)).unwrap();
        index.insert(1, &axis(8, 1, 1.0)).unwrap();
        index.insert(2, &vec3).unwrap();

        let results = index.search(&axis(8, 0, 3.0), 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].offset, 0);
        assert!((results[0].score - 1.0).abs() < 1e-5);
        assert_eq!(results[1].offset, 2);
    }

    #[test]
    fn test_vectors_normalised_on_insert() {
        let mut index = VectorIndex::new(4);
        index.insert(0, &axis(4, 2, 10.0)).unwrap();
        let results = index.search(&axis(4, 2, 1.0), 1).unwrap();
        assert!((results[0].score - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_offsets_follow_inserts() {
        let mut index = VectorIndex::new(4);
        index.insert(0, &axis(4, 0, 1.0)).unwrap();
        index.insert(2, &axis(4, 1, 1.0)).unwrap();
        assert_eq!(index.offsets(), &[0, 2]);

        let results = index.search(&axis(4, 1, 1.0), 1).unwrap();
        assert_eq!(results[0].offset, 2);
    }

    #[test]
    fn test_ties_ordered_by_offset() {
        let mut index = VectorIndex::new(4);
        index.insert(5, &axis(4, 0, 1.0)).unwrap();
        index.insert(1, &axis(4, 0, 1.0)).unwrap();
        let results = index.search(&axis(4, 0, 1.0), 2).unwrap();
        assert_eq!(results[0].offset, 1);
        assert_eq!(results[1].offset, 5);
    }

    #[test]
    fn test_empty_index_search() {
        let index = VectorIndex::new(4);
        assert!(index.search(&axis(4, 0, 1.0), 5).unwrap().is_empty());
    }

    #[test]
    fn test_dimension_validation() {
        let mut index = VectorIndex::new(384);
        assert!(index.insert(1, &vec![1.0; 128]).is_err());
        assert!(index.search(&vec![1.0; 128], 3).is_err());
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut index = VectorIndex::new(2);
        assert!(matches!(
            index.insert(7, &[f32::NAN, 1.0]),
            Err(VectorIndexError::NonFinite(7))
        ));
        assert!(index.is_empty());
    }
}
