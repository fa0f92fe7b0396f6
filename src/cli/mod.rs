//! CLI command definitions and parsing
use crate::document::DocumentType;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "lexrag",
    version,
    about = "Hybrid retrieval and reranking over legal documents",
    long_about = "lexrag chunks contracts, statutes and regulations along their legal structure, \
                  indexes them for dense and keyword search, and answers questions with a \
                  legal-domain reranking pipeline."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/lexrag/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Profile to apply on top of the config (e.g., "offline")
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a knowledge base from a directory and print the build report
    Index {
        /// Directory of .txt and .md documents
        dir: PathBuf,

        /// Type of every document in the directory
        #[arg(short, long, default_value = "contract")]
        doc_type: DocumentType,
    },

    /// Answer one query against a directory of documents
    Query {
        /// Directory of .txt and .md documents
        dir: PathBuf,

        /// Query text
        query: String,

        /// Type of every document in the directory
        #[arg(short, long, default_value = "contract")]
        doc_type: DocumentType,

        /// Use the fast reranking pipeline
        #[arg(long)]
        fast: bool,

        /// Expand the query with legal vocabulary before searching
        #[arg(long)]
        expand: bool,

        /// Number of passages to return
        #[arg(short, long)]
        limit: Option<usize>,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Interactive queries against a directory of documents
    Repl {
        /// Directory of .txt and .md documents
        dir: PathBuf,

        /// Type of every document in the directory
        #[arg(short, long, default_value = "contract")]
        doc_type: DocumentType,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

/// One line of REPL input
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Query(String),
    /// Rate a passage, or show its current feedback score when `score` is absent
    Feedback {
        chunk_id: String,
        score: Option<f32>,
    },
    /// Set a query hint such as `fast=true` or `top_n=5`
    Set { key: String, value: String },
    Entities {
        document_id: String,
        entity_type: Option<String>,
    },
    History,
    Stats,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ReplCommand::Empty;
        }
        if !line.starts_with(':') {
            return ReplCommand::Query(line.to_string());
        }

        let unknown = || ReplCommand::Unknown(line.to_string());
        let mut parts = line.split_whitespace();
        let command = parts.next();
        let args: Vec<&str> = parts.collect();

        match (command, args.as_slice()) {
            (Some(":quit") | Some(":q") | Some(":exit"), []) => ReplCommand::Quit,
            (Some(":stats"), []) => ReplCommand::Stats,
            (Some(":help"), []) => ReplCommand::Help,
            (Some(":history"), []) => ReplCommand::History,
            (Some(":feedback"), [chunk_id]) => ReplCommand::Feedback {
                chunk_id: chunk_id.to_string(),
                score: None,
            },
            (Some(":feedback"), [chunk_id, score]) => match score.parse::<f32>() {
                Ok(score) => ReplCommand::Feedback {
                    chunk_id: chunk_id.to_string(),
                    score: Some(score),
                },
                Err(_) => unknown(),
            },
            (Some(":set"), [assignment]) => match assignment.split_once('=') {
                Some((key, value)) if !key.is_empty() => ReplCommand::Set {
                    key: key.to_string(),
                    value: value.to_string(),
                },
                _ => unknown(),
            },
            (Some(":entities"), [document_id]) => ReplCommand::Entities {
                document_id: document_id.to_string(),
                entity_type: None,
            },
            (Some(":entities"), [document_id, entity_type]) => ReplCommand::Entities {
                document_id: document_id.to_string(),
                entity_type: Some(entity_type.to_string()),
            },
            _ => unknown(),
        }
    }
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_query_args() {
        let cli = Cli::parse_from([
            "lexrag", "query", "docs", "who pays?", "--doc-type", "statute", "--fast", "-l", "5",
        ]);
        match cli.command {
            Commands::Query {
                doc_type,
                fast,
                limit,
                expand,
                ..
            } => {
                assert_eq!(doc_type, DocumentType::Statute);
                assert!(fast);
                assert!(!expand);
                assert_eq!(limit, Some(5));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_repl_commands() {
        assert_eq!(ReplCommand::parse("  "), ReplCommand::Empty);
        assert_eq!(ReplCommand::parse(":q"), ReplCommand::Quit);
        assert_eq!(ReplCommand::parse(":stats"), ReplCommand::Stats);
        assert_eq!(ReplCommand::parse(":history"), ReplCommand::History);
        assert_eq!(
            ReplCommand::parse(":feedback abc123 0.9"),
            ReplCommand::Feedback {
                chunk_id: "abc123".to_string(),
                score: Some(0.9)
            }
        );
        assert_eq!(
            ReplCommand::parse(":feedback abc123"),
            ReplCommand::Feedback {
                chunk_id: "abc123".to_string(),
                score: None
            }
        );
        assert!(matches!(
            ReplCommand::parse(":feedback abc123 high"),
            ReplCommand::Unknown(_)
        ));
        assert_eq!(
            ReplCommand::parse("termination notice"),
            ReplCommand::Query("termination notice".to_string())
        );
    }

    #[test]
    fn test_repl_hints_and_entities() {
        assert_eq!(
            ReplCommand::parse(":set top_n=5"),
            ReplCommand::Set {
                key: "top_n".to_string(),
                value: "5".to_string()
            }
        );
        assert!(matches!(ReplCommand::parse(":set fast"), ReplCommand::Unknown(_)));
        assert!(matches!(ReplCommand::parse(":set =1"), ReplCommand::Unknown(_)));

        assert_eq!(
            ReplCommand::parse(":entities supply monetary_amount"),
            ReplCommand::Entities {
                document_id: "supply".to_string(),
                entity_type: Some("monetary_amount".to_string())
            }
        );
        assert!(matches!(ReplCommand::parse(":entities"), ReplCommand::Unknown(_)));
    }
}
