//! Entity extraction and knowledge records
//!
//! This module provides:
//! - Configuration-driven entity extraction using PatternRegistry
//! - Per-document knowledge records with co-occurrence relationships

mod extractor;
mod graph;
mod patterns;

pub use extractor::{Entity, EntityExtractor};
pub use graph::{EntityRef, KnowledgeRecord, RecordStats, Relationship, RelationshipKind};
pub use patterns::{
    default_entity_patterns, CompiledEntityPattern, EntityPatternConfig, ExtractedEntity,
    PatternRegistry,
};
