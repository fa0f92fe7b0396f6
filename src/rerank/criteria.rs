//! Multi-criteria scoring: relevance, domain, recency, precedent and document type

use crate::chunking::Chunk;
use crate::document::DocumentType;
use chrono::{DateTime, Utc};

const RELEVANCE_WEIGHT: f32 = 0.4;
const DOMAIN_WEIGHT: f32 = 0.3;
const RECENCY_WEIGHT: f32 = 0.1;
const PRECEDENT_WEIGHT: f32 = 0.1;
const DOC_TYPE_WEIGHT: f32 = 0.1;

const MIN_RECENCY: f32 = 0.1;

/// `max(0.1, 1 - days_old / 365)` over whole days since `timestamp`
pub fn recency(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> f32 {
    let days_old = (now - timestamp).num_days().max(0) as f32;
    (1.0 - days_old / 365.0).max(MIN_RECENCY)
}

/// Top-level pieces count more than sub-chunks
pub fn precedent(hierarchy_level: u8) -> f32 {
    1.0 / f32::from(hierarchy_level.max(1))
}

/// Document-type weight, 1.0 when it matches the caller's hint
pub fn doc_type_weight(doc_type: DocumentType, hint: Option<DocumentType>) -> f32 {
    match hint {
        Some(hinted) if hinted == doc_type => 1.0,
        _ => doc_type.weight(),
    }
}

pub fn multi_criteria_score(
    chunk: &Chunk,
    relevance: f32,
    domain: f32,
    hint: Option<DocumentType>,
    now: DateTime<Utc>,
) -> f32 {
    relevance * RELEVANCE_WEIGHT
        + domain * DOMAIN_WEIGHT
        + recency(chunk.source_timestamp, now) * RECENCY_WEIGHT
        + precedent(chunk.hierarchy_level) * PRECEDENT_WEIGHT
        + doc_type_weight(chunk.document_type, hint) * DOC_TYPE_WEIGHT
}
