//! Bounded log of executed queries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One executed query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub query: String,
    pub timestamp: DateTime<Utc>,
    /// Chunk ids returned to the caller, best first
    pub result_ids: Vec<String>,
    pub fast_mode: bool,
}

impl MemoryEntry {
    /// Number of passages the query returned
    pub fn result_count(&self) -> usize {
        self.result_ids.len()
    }
}

/// Query log that drops its oldest entries once it grows past `max_entries`
///
/// On overflow only the newest `trim_to` entries are kept.
#[derive(Debug, Clone)]
pub struct ConversationMemory {
    entries: VecDeque<MemoryEntry>,
    max_entries: usize,
    trim_to: usize,
}

impl ConversationMemory {
    pub fn new(max_entries: usize, trim_to: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_entries + 1),
            max_entries,
            trim_to: trim_to.min(max_entries),
        }
    }

    pub fn push(&mut self, entry: MemoryEntry) {
        self.entries.push_back(entry);

        if self.entries.len() > self.max_entries {
            let excess = self.entries.len() - self.trim_to;
            self.entries.drain(..excess);
            tracing::debug!("Conversation memory trimmed to {} entries", self.entries.len());
        }
    }

    /// Newest `n` entries, newest first
    pub fn recent(&self, n: usize) -> Vec<&MemoryEntry> {
        self.entries.iter().rev().take(n).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(50, 25)
    }
}
