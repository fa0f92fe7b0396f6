//! Adaptive sliding-window chunking for generic text

use super::{
    char_windows, classify_section, legal_importance, trim_span, Chunk, ChunkFactory, ChunkType,
    LegalChunker, CONTRACT_SECTIONS,
};

pub(super) fn split(chunker: &LegalChunker, factory: &ChunkFactory<'_>) -> Vec<Chunk> {
    let config = &chunker.config;
    let text = factory.document.text.as_str();

    let total_chars = text.chars().count();
    let window = (total_chars / 10).clamp(config.window_min_chars, config.window_max_chars);
    let overlap = (window as f32 * config.window_overlap_ratio) as usize;

    let mut chunks = Vec::new();
    for (start, end) in char_windows(text, window, overlap) {
        let Some(span) = trim_span(text, start, end) else {
            continue;
        };
        let piece = &text[span.0..span.1];
        if piece.chars().count() < config.min_fragment_chars {
            continue;
        }

        let section_type = classify_section(piece, &CONTRACT_SECTIONS);
        chunks.push(factory.make(
            span,
            piece,
            ChunkType::TextChunk,
            section_type,
            1,
            None,
            legal_importance(section_type, piece),
        ));
    }

    chunks
}

#[cfg(test)]
mod tests {
    use crate::chunking::{ChunkType, LegalChunker};
    use crate::config::ChunkingConfig;
    use crate::document::{Document, DocumentType};

    #[test]
    fn test_short_text_single_window() {
        let chunker = LegalChunker::new(ChunkingConfig::default());
        let text = "Meeting notes: the parties discussed the schedule for the next review of the draft.";
        let doc = Document::new("notes", text, DocumentType::Generic);
        let chunks = chunker.chunk(&doc);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_type, ChunkType::TextChunk);
    }

    #[test]
    fn test_noise_dropped() {
        let chunker = LegalChunker::new(ChunkingConfig::default());
        let doc = Document::new("tiny", "ok", DocumentType::Generic);
        assert!(chunker.chunk(&doc).is_empty());
    }

    #[test]
    fn test_adaptive_window_and_overlap() {
        let chunker = LegalChunker::new(ChunkingConfig::default());
        // 6000 chars -> window clamp(600) = 600, overlap 150, step 450
        let text = "abcdefghij".repeat(600);
        let doc = Document::new("long", text, DocumentType::Generic);
        let chunks = chunker.chunk(&doc);

        assert_eq!(chunks[0].text.chars().count(), 600);
        assert_eq!(chunks[1].span.0, 450);
        // windows at 0, 450, ..., 5400; the last one reaches the end
        assert_eq!(chunks.len(), 13);
        assert_eq!(chunks.last().unwrap().span.1, 6000);
    }
}
