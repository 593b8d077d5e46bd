//! Conversation history for Logbard.
//!
//! Summaries of past generations are stored append-only per owner and
//! retrieved under a token budget split between the freshest exchange
//! (conversation flow) and older context. Consecutive summaries can also be
//! grouped into conversation threads by a pairwise relatedness score.

pub mod manager;
pub mod store;
pub mod threading;

pub use manager::{ContextStatistics, ThreadManager};
pub use store::SqliteSummaryStore;
pub use threading::{group_threads, relatedness, ConversationThread};
