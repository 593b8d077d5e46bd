//! Entity behavior profiles for Logbard.
//!
//! Log lines are mined for entity names, classified into event categories,
//! and folded into per-entity profiles: counters, favorite subtypes, and a
//! clamped trait vector. Profiles feed one-sentence context blurbs into the
//! assembled prompt.

pub mod aggregate;
pub mod cache;
pub mod classify;
pub mod manager;
pub mod patterns;
pub mod store;

pub use aggregate::{apply_event, context_blurb, favorite_activities, notable_stats, personality_label};
pub use cache::{NoopCache, ProfileCache, TtlCache};
pub use classify::{classify, extract_details};
pub use manager::{EntityContext, ProfileManager};
pub use patterns::extract_entities;
pub use store::SqliteProfileStore;
