//! Structure-aware chunking of legal documents
//!
//! Contracts are split on paragraphs and classified by section, statutes and
//! regulations on legal markers ("Article 3", "Section 12", ...), everything else
//! with an adaptive sliding window. Long sections keep a bounded parent chunk and
//! get overlapping sub-chunks linked to it.

mod classify;
mod contract;
mod statute;
mod window;

pub use classify::{classify_section, legal_importance, CONTRACT_SECTIONS, RISK_TERMS};

use crate::config::ChunkingConfig;
use crate::document::{Document, DocumentType};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Legal category of a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    Financial,
    Liability,
    Termination,
    Confidentiality,
    IntellectualProperty,
    DisputeResolution,
    LegalProvision,
    General,
}

impl SectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionType::Financial => "financial",
            SectionType::Liability => "liability",
            SectionType::Termination => "termination",
            SectionType::Confidentiality => "confidentiality",
            SectionType::IntellectualProperty => "intellectual_property",
            SectionType::DisputeResolution => "dispute_resolution",
            SectionType::LegalProvision => "legal_provision",
            SectionType::General => "general",
        }
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural role of a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    Section,
    SubSection,
    LegalSection,
    TextChunk,
}

impl ChunkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkType::Section => "section",
            ChunkType::SubSection => "sub_section",
            ChunkType::LegalSection => "legal_section",
            ChunkType::TextChunk => "text_chunk",
        }
    }
}

/// The atomic retrieval unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable for the same document id, chunk type and source span
    pub id: String,
    pub text: String,
    pub source_document_id: String,
    pub document_type: DocumentType,
    pub section_type: SectionType,
    pub chunk_type: ChunkType,
    /// 1 for top-level pieces, 2 for sub-chunks
    pub hierarchy_level: u8,
    /// Set on sub-chunks only
    pub parent_id: Option<String>,
    /// In [0, 1]
    pub legal_importance: f32,
    /// Byte range of the source text inside the document
    pub span: (usize, usize),
    /// Timestamp of the owning document
    pub source_timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Chunk {
    /// Short preview of the text (first N characters)
    pub fn preview(&self, max_chars: usize) -> String {
        let head = head_chars(&self.text, max_chars);
        if head.len() < self.text.len() {
            format!("{}...", head)
        } else {
            head.to_string()
        }
    }
}

/// Splits documents into chunks according to their category
pub struct LegalChunker {
    config: ChunkingConfig,
    paragraph_break: Regex,
    legal_marker: Regex,
}

impl LegalChunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self {
            config,
            paragraph_break: Regex::new(r"\n\s*\n").expect("paragraph regex is valid"),
            legal_marker: Regex::new(
                r"(?mi)^[ \t]*(?:(?:Article|Section|Subsection|Paragraph|Clause)\s+(?:\d+[A-Za-z]?|[IVXLC]+)\b|§\s*\d+)",
            )
            .expect("legal marker regex is valid"),
        }
    }

    /// Split one document into an ordered list of chunks
    pub fn chunk(&self, document: &Document) -> Vec<Chunk> {
        if document.text.trim().is_empty() {
            tracing::debug!("Document {} is empty, no chunks produced", document.id);
            return Vec::new();
        }

        let factory = ChunkFactory::new(document);
        let chunks = match document.doc_type {
            DocumentType::Contract => contract::split(self, &factory),
            DocumentType::Statute | DocumentType::Regulation => statute::split(self, &factory),
            DocumentType::Generic => window::split(self, &factory),
        };

        tracing::debug!(
            "Chunked document {} ({}) into {} chunks",
            document.id,
            document.doc_type,
            chunks.len()
        );

        chunks
    }

    /// Chunk a corpus, keeping document order
    pub fn chunk_all(&self, documents: &[Document]) -> Vec<Chunk> {
        documents.iter().flat_map(|doc| self.chunk(doc)).collect()
    }

    /// Emit a top-level piece and, when it is too long, its overlapping sub-chunks
    fn emit_section(
        &self,
        factory: &ChunkFactory<'_>,
        span: (usize, usize),
        chunk_type: ChunkType,
        section_type: SectionType,
        importance: f32,
        out: &mut Vec<Chunk>,
    ) {
        let text = &factory.document.text[span.0..span.1];
        let max = self.config.max_section_chars;
        let oversized = text.chars().count() > max;

        let head = head_chars(text, max);
        let parent = factory.make(
            (span.0, span.0 + head.len()),
            head,
            chunk_type,
            section_type,
            1,
            None,
            importance,
        );
        let parent_id = parent.id.clone();
        out.push(parent);

        if !oversized {
            return;
        }

        for (start, end) in char_windows(
            text,
            self.config.sub_chunk_chars,
            self.config.sub_chunk_overlap,
        ) {
            let Some((start, end)) = trim_span(text, start, end) else {
                continue;
            };
            let piece = &text[start..end];
            if piece.chars().count() < self.config.min_fragment_chars {
                continue;
            }

            out.push(factory.make(
                (span.0 + start, span.0 + end),
                piece,
                ChunkType::SubSection,
                section_type,
                2,
                Some(parent_id.clone()),
                importance,
            ));
        }
    }
}

/// Builds chunks for one document with a shared construction time
struct ChunkFactory<'a> {
    document: &'a Document,
    created_at: DateTime<Utc>,
}

impl<'a> ChunkFactory<'a> {
    fn new(document: &'a Document) -> Self {
        Self {
            document,
            created_at: Utc::now(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn make(
        &self,
        span: (usize, usize),
        text: &str,
        chunk_type: ChunkType,
        section_type: SectionType,
        hierarchy_level: u8,
        parent_id: Option<String>,
        legal_importance: f32,
    ) -> Chunk {
        Chunk {
            id: chunk_id(&self.document.id, chunk_type, span),
            text: text.to_string(),
            source_document_id: self.document.id.clone(),
            document_type: self.document.doc_type,
            section_type,
            chunk_type,
            hierarchy_level,
            parent_id,
            legal_importance,
            span,
            source_timestamp: self.document.timestamp,
            created_at: self.created_at,
        }
    }
}

/// Deterministic chunk id: document id plus a short blake3 digest of the span
pub fn chunk_id(document_id: &str, chunk_type: ChunkType, span: (usize, usize)) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(document_id.as_bytes());
    hasher.update(&[0]);
    hasher.update(chunk_type.as_str().as_bytes());
    hasher.update(&(span.0 as u64).to_le_bytes());
    hasher.update(&(span.1 as u64).to_le_bytes());
    let digest = hasher.finalize().to_hex();
    format!("{}-{}", document_id, &digest.as_str()[..12])
}

/// Shrink `text[start..end]` to its non-whitespace core, `None` when blank
fn trim_span(text: &str, start: usize, end: usize) -> Option<(usize, usize)> {
    let slice = &text[start..end];
    let trimmed = slice.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lead = slice.len() - slice.trim_start().len();
    Some((start + lead, start + lead + trimmed.len()))
}

/// Byte ranges of windows of `size` chars, consecutive windows sharing `overlap` chars
fn char_windows(text: &str, size: usize, overlap: usize) -> Vec<(usize, usize)> {
    let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    boundaries.push(text.len());
    let total = boundaries.len() - 1;

    if total == 0 || size == 0 {
        return Vec::new();
    }

    let step = size.saturating_sub(overlap).max(1);
    let mut windows = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + size).min(total);
        windows.push((boundaries[start], boundaries[end]));
        if end == total {
            break;
        }
        start += step;
    }
    windows
}

/// First `max_chars` characters of `text`
fn head_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_windows_overlap() {
        let text = "abcdefghij";
        let windows = char_windows(text, 4, 1);
        let pieces: Vec<&str> = windows.iter().map(|(s, e)| &text[*s..*e]).collect();
        assert_eq!(pieces, vec!["abcd", "defg", "ghij"]);
    }

    #[test]
    fn test_char_windows_multibyte() {
        let text = "§§§§§§";
        let windows = char_windows(text, 4, 2);
        for (s, e) in windows {
            assert!(text.is_char_boundary(s) && text.is_char_boundary(e));
        }
    }

    #[test]
    fn test_trim_span() {
        let text = "  hello  ";
        assert_eq!(trim_span(text, 0, text.len()), Some((2, 7)));
        assert_eq!(trim_span("   ", 0, 3), None);
    }

    #[test]
    fn test_chunk_id_is_stable() {
        let a = chunk_id("doc", ChunkType::Section, (0, 10));
        let b = chunk_id("doc", ChunkType::Section, (0, 10));
        let c = chunk_id("doc", ChunkType::SubSection, (0, 10));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("doc-"));
    }

    #[test]
    fn test_empty_document() {
        let chunker = LegalChunker::new(ChunkingConfig::default());
        let doc = Document::new("empty", "   \n\n  ", DocumentType::Contract);
        assert!(chunker.chunk(&doc).is_empty());
    }
}
