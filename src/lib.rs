//! lexrag - hybrid retrieval and reranking for legal documents
//!
//! Documents are split along their legal structure, indexed for dense and
//! keyword search, and queries are answered by fusing both signals and running
//! the best candidates through a legal-domain reranking pipeline with a
//! feedback blend.

pub mod chunking;
pub mod cli;
pub mod config;
pub mod document;
pub mod embedding;
pub mod entities;
pub mod error;
pub mod knowledge;
pub mod memory;
pub mod providers;
pub mod rerank;
pub mod retrieval;
pub mod tokenizer;

pub use error::{LexragError, Result};
