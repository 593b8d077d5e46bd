//! # Logbard Core
//!
//! Domain types, traits, and error definitions for the Logbard commentary
//! engine. This crate has **zero framework dependencies** — it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every storage backend and external collaborator is defined as a trait
//! here. Implementations live in their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod collaborator;
pub mod error;
pub mod memory;
pub mod profile;
pub mod summary;
pub mod tier;
pub mod token;

// Re-export key types at crate root for ergonomics
pub use collaborator::{Delivery, Embedder, Generator, LogSource};
pub use error::{Error, HistoryError, MemoryError, ProfileError, ProviderError, Result};
pub use memory::{MemoryArchive, MemoryRecord};
pub use profile::{ClassifiedEvent, EntityEvent, EntityProfile, EventKind, ProfileStore, TraitKind};
pub use summary::{NewSummary, SummaryRecord, SummaryStore};
pub use tier::TierOutcome;
pub use token::{HeuristicCounter, TokenCounter};
