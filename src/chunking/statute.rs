//! Statute and regulation chunking on legal markers

use super::{trim_span, Chunk, ChunkFactory, ChunkType, LegalChunker, SectionType};

/// Fixed importance of legislative sections
pub(super) const LEGAL_SECTION_IMPORTANCE: f32 = 0.8;

pub(super) fn split(chunker: &LegalChunker, factory: &ChunkFactory<'_>) -> Vec<Chunk> {
    let text = factory.document.text.as_str();

    // Every marker starts a new piece; text before the first marker is kept as well
    let mut boundaries: Vec<usize> = chunker
        .legal_marker
        .find_iter(text)
        .map(|m| m.start())
        .filter(|&start| start > 0)
        .collect();
    boundaries.insert(0, 0);
    boundaries.push(text.len());

    if boundaries.len() == 2 {
        tracing::debug!(
            "No legal markers found in {}, treating it as a single section",
            factory.document.id
        );
    }

    let mut chunks = Vec::new();
    for pair in boundaries.windows(2) {
        let Some(span) = trim_span(text, pair[0], pair[1]) else {
            continue;
        };

        if text[span.0..span.1].chars().count() < chunker.config.min_fragment_chars {
            continue;
        }

        chunker.emit_section(
            factory,
            span,
            ChunkType::LegalSection,
            SectionType::LegalProvision,
            LEGAL_SECTION_IMPORTANCE,
            &mut chunks,
        );
    }

    chunks
}
