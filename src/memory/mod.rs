//! Feedback scores and conversation memory

mod conversation;
mod feedback;

pub use conversation::{ConversationMemory, MemoryEntry};
pub use feedback::{FeedbackStore, DEFAULT_FEEDBACK};
