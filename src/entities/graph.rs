//! Per-document knowledge records
//!
//! Entities are de-duplicated per document; entities that appear in the same
//! chunk are linked by co-occurrence relationships.

use super::Entity;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Relationship kind between two entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    /// Both entities appear in the same chunk
    CoOccurrence,
}

/// Entity reference by type and value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity_type: String,
    pub value: String,
}

impl From<&Entity> for EntityRef {
    fn from(entity: &Entity) -> Self {
        Self {
            entity_type: entity.entity_type.clone(),
            value: entity.value.clone(),
        }
    }
}

/// Link between two distinct entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub source: EntityRef,
    pub target: EntityRef,
    pub kind: RelationshipKind,
    /// Chunk where the two entities co-occur
    pub chunk_id: String,
}

/// Counts over one record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordStats {
    pub chunks: usize,
    pub entities: usize,
    pub relationships: usize,
    pub entities_by_type: BTreeMap<String, usize>,
}

/// Structured knowledge extracted from one document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeRecord {
    pub document_id: String,
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
    pub stats: RecordStats,
}

impl KnowledgeRecord {
    /// Build a record from the entities of each chunk of a document, in chunk order
    pub fn build(document_id: &str, per_chunk: &[(String, Vec<Entity>)]) -> Self {
        let mut seen: HashSet<EntityRef> = HashSet::new();
        let mut entities = Vec::new();
        let mut relationships = Vec::new();

        for (chunk_id, chunk_entities) in per_chunk {
            for entity in chunk_entities {
                if seen.insert(EntityRef::from(entity)) {
                    entities.push(entity.clone());
                }
            }

            // Distinct entities of this chunk in first-seen order
            let mut local: Vec<EntityRef> = Vec::new();
            for entity in chunk_entities {
                let entity_ref = EntityRef::from(entity);
                if !local.contains(&entity_ref) {
                    local.push(entity_ref);
                }
            }

            for (i, source) in local.iter().enumerate() {
                for target in &local[i + 1..] {
                    relationships.push(Relationship {
                        source: source.clone(),
                        target: target.clone(),
                        kind: RelationshipKind::CoOccurrence,
                        chunk_id: chunk_id.clone(),
                    });
                }
            }
        }

        let mut entities_by_type = BTreeMap::new();
        for entity in &entities {
            *entities_by_type
                .entry(entity.entity_type.clone())
                .or_insert(0) += 1;
        }

        let stats = RecordStats {
            chunks: per_chunk.len(),
            entities: entities.len(),
            relationships: relationships.len(),
            entities_by_type,
        };

        Self {
            document_id: document_id.to_string(),
            entities,
            relationships,
            stats,
        }
    }

    /// Entities of one type
    pub fn entities_of_type<'a>(&'a self, entity_type: &'a str) -> impl Iterator<Item = &'a Entity> {
        self.entities
            .iter()
            .filter(move |e| e.entity_type == entity_type)
    }
}
