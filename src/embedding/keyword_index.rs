/// In-memory BM25 keyword index over legal tokens
use crate::tokenizer::LegalTokenizer;
use ahash::{AHashMap, AHashSet};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KeywordIndexError {
    #[error("Chunk {0} has no indexable tokens")]
    EmptyDocument(usize),

    #[error("Invalid BM25 parameters: {0}")]
    InvalidParameters(String),
}

/// Search result with chunk offset and raw BM25 score
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordSearchResult {
    /// Position of the chunk in the knowledge base chunk list
    pub offset: usize,
    /// BM25 relevance score, unnormalised
    pub score: f32,
}

#[derive(Debug, Clone, Copy)]
struct Posting {
    row: usize,
    term_frequency: u32,
}

/// BM25 index
///
/// Documents are token streams of the [`LegalTokenizer`], so legal phrases
/// count as single terms. Row `i` belongs to the chunk at `rows[i]`.
pub struct KeywordIndex {
    tokenizer: LegalTokenizer,
    k1: f32,
    b: f32,
    postings: AHashMap<String, Vec<Posting>>,
    doc_lengths: Vec<u32>,
    rows: Vec<usize>,
    total_length: u64,
}

impl KeywordIndex {
    /// Create an empty index with the given BM25 parameters
    pub fn new(k1: f32, b: f32) -> Result<Self, KeywordIndexError> {
        if !k1.is_finite() || k1 < 0.0 {
            return Err(KeywordIndexError::InvalidParameters(format!(
                "k1 must be a non-negative number, got {}",
                k1
            )));
        }
        if !(0.0..=1.0).contains(&b) {
            return Err(KeywordIndexError::InvalidParameters(format!(
                "b must be in [0, 1], got {}",
                b
            )));
        }

        Ok(Self {
            tokenizer: LegalTokenizer::new(),
            k1,
            b,
            postings: AHashMap::new(),
            doc_lengths: Vec::new(),
            rows: Vec::new(),
            total_length: 0,
        })
    }

    /// Index the text of the chunk at `offset`
    pub fn insert(&mut self, offset: usize, text: &str) -> Result<(), KeywordIndexError> {
        let tokens = self.tokenizer.tokenize(text);
        if tokens.is_empty() {
            return Err(KeywordIndexError::EmptyDocument(offset));
        }

        let row = self.rows.len();
        let mut frequencies: AHashMap<String, u32> = AHashMap::new();
        for token in &tokens {
            *frequencies.entry(token.clone()).or_insert(0) += 1;
        }
        for (term, term_frequency) in frequencies {
            self.postings.entry(term).or_default().push(Posting {
                row,
                term_frequency,
            });
        }

        self.doc_lengths.push(tokens.len() as u32);
        self.total_length += tokens.len() as u64;
        self.rows.push(offset);

        Ok(())
    }

    /// Top `limit` chunks by BM25 score for the query
    ///
    /// Only chunks sharing at least one term with the query are returned.
    /// Sorted by score descending, ties broken by chunk offset.
    pub fn search(&self, query: &str, limit: usize) -> Vec<KeywordSearchResult> {
        if self.rows.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut seen = AHashSet::new();
        let terms: Vec<String> = self
            .tokenizer
            .tokenize(query)
            .into_iter()
            .filter(|t| seen.insert(t.clone()))
            .collect();

        let total_docs = self.rows.len() as f32;
        let avg_length = (self.total_length as f32 / total_docs).max(1.0);

        let mut scores: AHashMap<usize, f32> = AHashMap::new();
        for term in &terms {
            let Some(postings) = self.postings.get(term) else {
                continue;
            };
            let idf = idf(total_docs, postings.len() as f32);

            for posting in postings {
                let tf = posting.term_frequency as f32;
                let length = self.doc_lengths[posting.row] as f32;
                let norm = self.k1 * (1.0 - self.b + self.b * length / avg_length);
                *scores.entry(posting.row).or_insert(0.0) += idf * tf * (self.k1 + 1.0) / (tf + norm);
            }
        }

        let mut results: Vec<KeywordSearchResult> = scores
            .into_iter()
            .map(|(row, score)| KeywordSearchResult {
                offset: self.rows[row],
                score,
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.offset.cmp(&b.offset))
        });
        results.truncate(limit);
        results
    }

    /// Tokenize a query the way documents were tokenized
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        self.tokenizer.tokenize(text)
    }

    /// Chunk offsets in row order
    pub fn offsets(&self) -> &[usize] {
        &self.rows
    }

    /// Number of distinct terms
    pub fn vocabulary_size(&self) -> usize {
        self.postings.len()
    }

    /// Get the number of documents in the index
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if index is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Smoothed idf, always positive
fn idf(total_docs: f32, doc_freq: f32) -> f32 {
    (1.0 + (total_docs - doc_freq + 0.5) / (doc_freq + 0.5)).ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> KeywordIndex {
        KeywordIndex::new(1.5, 0.75).unwrap()
    }

    #[test]
    fn test_index_creation() {
        let index = index();
        assert_eq!(index.len(), 0);
        assert!(index.is_empty());
        assert!(index.search("anything", 10).is_empty());
    }

    #[test]
    fn test_insert_and_search() {
        let mut index = index();
        index
            .insert(0, "Either party may terminate this agreement upon notice")
            .unwrap();
        index
            .insert(1, "The client shall pay every invoice within thirty days")
            .unwrap();
        index
            .insert(2, "Termination fees are payable upon terminate events")
            .unwrap();

        let results = index.search("terminate", 10);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.offset != 1));

        let results = index.search("invoice", 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].offset, 1);
    }

    #[test]
    fn test_phrase_terms() {
        let mut index = index();
        index
            .insert(0, "Neither party is liable for force majeure events")
            .unwrap();
        index
            .insert(1, "The majeure clause and the force of law")
            .unwrap();

        let results = index.search("force majeure", 10);
        assert_eq!(results[0].offset, 0);
        // "force" and "majeure" alone are separate terms from the phrase
        assert!(results.iter().all(|r| r.offset == 0));
    }

    #[test]
    fn test_rare_terms_weigh_more() {
        let mut index = index();
        index.insert(0, "payment payment schedule").unwrap();
        index.insert(1, "payment indemnity schedule").unwrap();
        index.insert(2, "payment schedule").unwrap();

        let results = index.search("payment indemnity", 10);
        assert_eq!(results[0].offset, 1);
    }

    #[test]
    fn test_empty_document_rejected() {
        let mut index = index();
        assert!(matches!(
            index.insert(4, "a an of"),
            Err(KeywordIndexError::EmptyDocument(4))
        ));
        assert!(index.is_empty());
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(KeywordIndex::new(-1.0, 0.75).is_err());
        assert!(KeywordIndex::new(1.2, 1.5).is_err());
    }

    #[test]
    fn test_idf_positive() {
        assert!(idf(10.0, 10.0) > 0.0);
        assert!(idf(10.0, 1.0) > idf(10.0, 5.0));
    }

    #[test]
    fn test_insert_offsets() {
        let mut index = index();
        index.insert(0, "Document one text").unwrap();
        index.insert(3, "Document two text").unwrap();
        assert_eq!(index.offsets(), &[0, 3]);
        assert!(index.vocabulary_size() >= 3);
    }
}
