//! Pattern registry for configuration-driven entity extraction
//!
//! Patterns come from `[[entities.pattern]]` tables in the configuration; the
//! built-in defaults cover monetary amounts, dates, percentages and durations.

use crate::error::{LexragError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Entity pattern configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityPatternConfig {
    #[serde(rename = "type")]
    pub type_name: String,
    pub pattern: String,
    pub confidence: f32,
    /// Characters of surrounding text kept on each side of a match
    #[serde(default = "default_context_window")]
    pub context_window: usize,
    #[serde(default)]
    pub description: String,
}

fn default_context_window() -> usize {
    40
}

/// Patterns used when the configuration does not list any
pub fn default_entity_patterns() -> Vec<EntityPatternConfig> {
    vec![
        EntityPatternConfig {
            type_name: "monetary_amount".to_string(),
            pattern: r"(?i)(?:[$€£]\s?\d{1,3}(?:,\d{3})*(?:\.\d+)?|\b\d+(?:,\d{3})*(?:\.\d+)?\s?(?:usd|eur|gbp|dollars|euros|pounds)\b)".to_string(),
            confidence: 0.9,
            context_window: 40,
            description: "Currency amount".to_string(),
        },
        EntityPatternConfig {
            type_name: "date".to_string(),
            pattern: r"\b(?:\d{1,2}/\d{1,2}/\d{2,4}|\d{4}-\d{2}-\d{2}|(?:January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2},?\s+\d{4})\b".to_string(),
            confidence: 0.85,
            context_window: 40,
            description: "Calendar date".to_string(),
        },
        EntityPatternConfig {
            type_name: "percentage".to_string(),
            pattern: r"(?i)\b\d+(?:\.\d+)?\s?(?:%|percent\b)".to_string(),
            confidence: 0.9,
            context_window: 40,
            description: "Percentage".to_string(),
        },
        EntityPatternConfig {
            type_name: "duration".to_string(),
            pattern: r"(?i)\b(?:\d+|one|two|three|four|five|six|seven|eight|nine|ten|twelve|fifteen|thirty|sixty|ninety)\s+(?:business\s+|calendar\s+)?(?:days?|weeks?|months?|years?)\b".to_string(),
            confidence: 0.8,
            context_window: 40,
            description: "Time period".to_string(),
        },
    ]
}

/// Compiled entity pattern with pre-compiled regex
#[derive(Debug, Clone)]
pub struct CompiledEntityPattern {
    pub type_name: String,
    pub regex: Regex,
    pub confidence: f32,
    pub context_window: usize,
}

/// Match of one entity pattern
#[derive(Debug, Clone)]
pub struct ExtractedEntity {
    pub type_name: String,
    pub value: String,
    pub start: usize,
    pub end: usize,
    pub context: String,
    pub confidence: f32,
}

/// Registry of pre-compiled entity patterns
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    pub entities: Vec<CompiledEntityPattern>,
    /// Entity lookup by type name
    pub entities_by_type: HashMap<String, usize>,
}

impl PatternRegistry {
    /// Compile every configured pattern
    pub fn from_configs(patterns: &[EntityPatternConfig]) -> Result<Self> {
        let mut entities = Vec::new();
        let mut entities_by_type = HashMap::new();

        for (idx, entity_cfg) in patterns.iter().enumerate() {
            let regex = Regex::new(&entity_cfg.pattern).map_err(|e| {
                LexragError::Config(format!(
                    "Invalid regex for entity '{}': {}",
                    entity_cfg.type_name, e
                ))
            })?;

            entities.push(CompiledEntityPattern {
                type_name: entity_cfg.type_name.clone(),
                regex,
                confidence: entity_cfg.confidence,
                context_window: entity_cfg.context_window,
            });

            entities_by_type.insert(entity_cfg.type_name.clone(), idx);
        }

        Ok(Self {
            entities,
            entities_by_type,
        })
    }

    /// All matches of all patterns, sorted by position in text
    pub fn extract_entities(&self, text: &str) -> Vec<ExtractedEntity> {
        let mut found: Vec<ExtractedEntity> = self
            .entities
            .iter()
            .flat_map(|pattern| {
                pattern.regex.find_iter(text).map(|m| ExtractedEntity {
                    type_name: pattern.type_name.clone(),
                    value: m.as_str().trim().to_string(),
                    start: m.start(),
                    end: m.end(),
                    context: Self::get_context(text, m.start(), m.end(), pattern.context_window),
                    confidence: pattern.confidence,
                })
            })
            .collect();

        found.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.type_name.cmp(&b.type_name)));
        found
    }

    /// Get context around a match, widened to char boundaries
    fn get_context(text: &str, start: usize, end: usize, window: usize) -> String {
        let mut context_start = start.saturating_sub(window);
        while !text.is_char_boundary(context_start) {
            context_start -= 1;
        }
        let mut context_end = (end + window).min(text.len());
        while !text.is_char_boundary(context_end) {
            context_end += 1;
        }
        text[context_start..context_end].trim().to_string()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(registry: &PatternRegistry, text: &str) -> Vec<String> {
        registry
            .extract_entities(text)
            .into_iter()
            .map(|e| e.type_name)
            .collect()
    }

    #[test]
    fn test_default_patterns_compile() {
        let registry = PatternRegistry::from_configs(&default_entity_patterns()).unwrap();
        assert_eq!(registry.len(), 4);
        assert!(registry.entities_by_type.contains_key("monetary_amount"));
        assert!(registry.entities_by_type.contains_key("duration"));
    }

    #[test]
    fn test_monetary_amounts() {
        let registry = PatternRegistry::from_configs(&default_entity_patterns()).unwrap();
        let entities = registry.extract_entities("A fee of $5,000.00 plus 200 EUR per month.");
        let values: Vec<&str> = entities
            .iter()
            .filter(|e| e.type_name == "monetary_amount")
            .map(|e| e.value.as_str())
            .collect();
        assert_eq!(values, vec!["$5,000.00", "200 EUR"]);
    }

    #[test]
    fn test_dates_percentages_durations() {
        let registry = PatternRegistry::from_configs(&default_entity_patterns()).unwrap();
        let text = "Effective January 1, 2024, interest of 5% accrues after thirty days.";
        let found = types(&registry, text);
        assert_eq!(found, vec!["date", "percentage", "duration"]);
    }

    #[test]
    fn test_context_window() {
        let registry = PatternRegistry::from_configs(&default_entity_patterns()).unwrap();
        let text = "Payment is due within 30 days of receipt of the invoice by the Client.";
        let entity = registry
            .extract_entities(text)
            .into_iter()
            .find(|e| e.type_name == "duration")
            .unwrap();
        assert_eq!(entity.value, "30 days");
        assert!(entity.context.contains("due within 30 days of receipt"));
    }

    #[test]
    fn test_context_is_char_safe() {
        let registry = PatternRegistry::from_configs(&default_entity_patterns()).unwrap();
        let text = "§§§§§§§§§§§§§§§§§§§§ 10% §§§§§§§§§§§§§§§§§§§§";
        let entities = registry.extract_entities(text);
        assert_eq!(entities.len(), 1);
        assert!(entities[0].context.contains("10%"));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let patterns = vec![EntityPatternConfig {
            type_name: "broken".to_string(),
            pattern: "(unclosed".to_string(),
            confidence: 0.5,
            context_window: 10,
            description: String::new(),
        }];
        assert!(PatternRegistry::from_configs(&patterns).is_err());
    }

    #[test]
    fn test_pattern_config_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            pattern: Vec<EntityPatternConfig>,
        }

        let parsed: Wrapper = toml::from_str(
            r#"
            [[pattern]]
            type = "case_number"
            pattern = 'No\. \d+'
            confidence = 0.7
            "#,
        )
        .unwrap();
        assert_eq!(parsed.pattern[0].type_name, "case_number");
        assert_eq!(parsed.pattern[0].context_window, 40);
    }
}
