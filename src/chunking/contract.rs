//! Contract chunking: paragraph sections classified by keyword

use super::{
    classify_section, legal_importance, trim_span, Chunk, ChunkFactory, ChunkType, LegalChunker,
    CONTRACT_SECTIONS,
};

pub(super) fn split(chunker: &LegalChunker, factory: &ChunkFactory<'_>) -> Vec<Chunk> {
    let text = factory.document.text.as_str();

    let mut spans = Vec::new();
    let mut start = 0;
    for m in chunker.paragraph_break.find_iter(text) {
        spans.push((start, m.start()));
        start = m.end();
    }
    spans.push((start, text.len()));

    let mut chunks = Vec::new();
    for (start, end) in spans {
        let Some(span) = trim_span(text, start, end) else {
            continue;
        };
        let section = &text[span.0..span.1];

        if section.chars().count() < chunker.config.min_section_chars {
            tracing::trace!("Dropping short contract section at {:?}", span);
            continue;
        }

        let section_type = classify_section(section, &CONTRACT_SECTIONS);
        let importance = legal_importance(section_type, section);

        chunker.emit_section(
            factory,
            span,
            ChunkType::Section,
            section_type,
            importance,
            &mut chunks,
        );
    }

    chunks
}
