//! Source documents handed over by the ingestion layer
//!
//! Text is expected to be sanitised already (PII masking happens upstream).

use crate::error::{LexragError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Document category, decides the chunking strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Contract,
    Statute,
    Regulation,
    Generic,
}

impl DocumentType {
    /// Weight used by the multi-criteria reranking stage
    pub fn weight(&self) -> f32 {
        match self {
            DocumentType::Statute => 1.0,
            DocumentType::Regulation => 0.9,
            DocumentType::Contract => 0.8,
            DocumentType::Generic => 0.5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Contract => "contract",
            DocumentType::Statute => "statute",
            DocumentType::Regulation => "regulation",
            DocumentType::Generic => "generic",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = LexragError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "contract" | "agreement" => Ok(DocumentType::Contract),
            "statute" | "law" | "act" => Ok(DocumentType::Statute),
            "regulation" => Ok(DocumentType::Regulation),
            "generic" | "text" | "other" => Ok(DocumentType::Generic),
            other => Err(LexragError::InvalidConfigValue {
                path: "document_type".to_string(),
                message: format!("Unknown document type: {}", other),
            }),
        }
    }
}

/// A sanitised source document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub doc_type: DocumentType,
    pub timestamp: DateTime<Utc>,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>, doc_type: DocumentType) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            doc_type,
            timestamp: Utc::now(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Load every `.txt` / `.md` file of a directory as a document of the given type.
///
/// The file stem becomes the document id and the modification time its timestamp.
/// Files are read in path order so builds are reproducible. A file that cannot be
/// read as UTF-8 text is skipped with a warning.
pub fn load_directory(dir: &Path, doc_type: DocumentType) -> Result<Vec<Document>> {
    let entries = std::fs::read_dir(dir).map_err(|e| LexragError::Io {
        source: e,
        context: format!("Failed to read document directory: {:?}", dir),
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| LexragError::Io {
            source: e,
            context: format!("Failed to read entry in {:?}", dir),
        })?;
        let path = entry.path();

        let is_text = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("txt") || ext.eq_ignore_ascii_case("md"))
            .unwrap_or(false);
        if path.is_file() && is_text {
            paths.push(path);
        }
    }
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
            tracing::warn!("Skipping file with non UTF-8 name: {:?}", path);
            continue;
        };

        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Skipping unreadable document {:?}: {}", path, e);
                continue;
            }
        };

        let timestamp = std::fs::metadata(&path)
            .and_then(|m| m.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        documents.push(Document::new(id, text, doc_type).with_timestamp(timestamp));
    }

    tracing::info!("Loaded {} documents from {:?}", documents.len(), dir);

    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_document_type() {
        assert_eq!("Agreement".parse::<DocumentType>().unwrap(), DocumentType::Contract);
        assert_eq!("law".parse::<DocumentType>().unwrap(), DocumentType::Statute);
        assert_eq!(" regulation ".parse::<DocumentType>().unwrap(), DocumentType::Regulation);
        assert!("spreadsheet".parse::<DocumentType>().is_err());
    }

    #[test]
    fn test_load_directory() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("b.txt"), "second document").unwrap();
        std::fs::write(temp.path().join("a.md"), "first document").unwrap();
        std::fs::write(temp.path().join("ignored.pdf"), "binary").unwrap();

        let docs = load_directory(temp.path(), DocumentType::Contract).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, "a");
        assert_eq!(docs[1].id, "b");
        assert!(docs.iter().all(|d| d.doc_type == DocumentType::Contract));
    }

    #[test]
    fn test_load_directory_skips_unreadable_file() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("binary.txt"), [0xff, 0xfe, 0x00, 0x41]).unwrap();
        std::fs::write(temp.path().join("lease.txt"), "The tenant shall pay rent.").unwrap();

        let docs = load_directory(temp.path(), DocumentType::Contract).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "lease");
    }

    #[test]
    fn test_load_directory_same_stem_in_path_order() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("terms.txt"), "plain text terms").unwrap();
        std::fs::write(temp.path().join("terms.md"), "markdown terms").unwrap();

        let docs = load_directory(temp.path(), DocumentType::Contract).unwrap();
        let texts: Vec<&str> = docs.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(texts, vec!["markdown terms", "plain text terms"]);
    }
}
