//! Entity extraction using PatternRegistry

use super::patterns::{ExtractedEntity, PatternRegistry};
use serde::{Deserialize, Serialize};

/// Extracted entity with metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Entity type (monetary_amount, date, percentage, duration, ...)
    pub entity_type: String,
    /// Extracted value
    pub value: String,
    /// Context surrounding the entity
    pub context: String,
    /// Confidence score (0.0 - 1.0)
    pub confidence: f32,
    /// Chunk the entity was found in
    pub chunk_id: String,
}

impl Entity {
    fn from_extracted(extracted: ExtractedEntity, chunk_id: &str) -> Self {
        Self {
            entity_type: extracted.type_name,
            value: extracted.value,
            context: extracted.context,
            confidence: extracted.confidence,
            chunk_id: chunk_id.to_string(),
        }
    }
}

/// Entity extractor using PatternRegistry
pub struct EntityExtractor {
    registry: PatternRegistry,
}

impl EntityExtractor {
    pub fn new(registry: PatternRegistry) -> Self {
        Self { registry }
    }

    /// Extract all entities from the text of one chunk
    ///
    /// Returns entities sorted by position in text
    pub fn extract(&self, text: &str, chunk_id: &str) -> Vec<Entity> {
        self.registry
            .extract_entities(text)
            .into_iter()
            .map(|e| Entity::from_extracted(e, chunk_id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::default_entity_patterns;

    fn create_test_extractor() -> EntityExtractor {
        EntityExtractor::new(PatternRegistry::from_configs(&default_entity_patterns()).unwrap())
    }

    #[test]
    fn test_extract_basic() {
        let extractor = create_test_extractor();
        let text = "The Client pays $12,000 within 45 days.";
        let entities = extractor.extract(text, "msa-1");

        assert_eq!(entities.len(), 2);
        assert!(entities.iter().any(|e| e.value == "$12,000"));
        assert!(entities.iter().any(|e| e.value == "45 days"));
        assert!(entities.iter().all(|e| e.chunk_id == "msa-1"));
    }

    #[test]
    fn test_entity_types_and_confidence() {
        let extractor = create_test_extractor();
        let entities = extractor.extract("A 10% discount applies for 12 months.", "c");

        let percentage = entities.iter().find(|e| e.entity_type == "percentage").unwrap();
        assert_eq!(percentage.value, "10%");
        assert!(percentage.confidence > 0.85);

        let duration = entities.iter().find(|e| e.entity_type == "duration").unwrap();
        assert_eq!(duration.value, "12 months");
        assert!(duration.confidence < percentage.confidence);
    }

    #[test]
    fn test_no_matches() {
        let extractor = create_test_extractor();
        assert!(extractor.extract("", "c").is_empty());
        assert!(extractor.extract("No entities in this text", "c").is_empty());
    }
}
