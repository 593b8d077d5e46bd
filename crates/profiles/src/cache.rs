//! Profile caching.
//!
//! An explicit cache abstraction injected into the profile manager, so
//! tests can swap in a no-op. The TTL cache holds its lock only for the
//! map operation itself, never across a storage round-trip.

use logbard_core::profile::EntityProfile;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Cache for entity profiles.
pub trait ProfileCache: Send + Sync {
    /// A fresh cached profile, or `None` on miss/expiry.
    fn get(&self, entity_name: &str) -> Option<EntityProfile>;

    /// Insert or refresh a profile.
    fn put(&self, profile: EntityProfile);

    /// Drop one entry.
    fn invalidate(&self, entity_name: &str);
}

/// In-memory TTL cache behind a single mutex.
pub struct TtlCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, EntityProfile)>>,
}

impl TtlCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl ProfileCache for TtlCache {
    fn get(&self, entity_name: &str) -> Option<EntityProfile> {
        let mut entries = self.entries.lock().expect("profile cache poisoned");
        match entries.get(entity_name) {
            Some((cached_at, profile)) if cached_at.elapsed() < self.ttl => Some(profile.clone()),
            Some(_) => {
                entries.remove(entity_name);
                None
            }
            None => None,
        }
    }

    fn put(&self, profile: EntityProfile) {
        let mut entries = self.entries.lock().expect("profile cache poisoned");
        entries.insert(profile.entity_name.clone(), (Instant::now(), profile));
    }

    fn invalidate(&self, entity_name: &str) {
        let mut entries = self.entries.lock().expect("profile cache poisoned");
        entries.remove(entity_name);
    }
}

/// A cache that never holds anything. For tests and tiny deployments.
pub struct NoopCache;

impl ProfileCache for NoopCache {
    fn get(&self, _entity_name: &str) -> Option<EntityProfile> {
        None
    }

    fn put(&self, _profile: EntityProfile) {}

    fn invalidate(&self, _entity_name: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_within_ttl() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.put(EntityProfile::new("Sletty"));
        assert!(cache.get("Sletty").is_some());
    }

    #[test]
    fn miss_after_expiry() {
        let cache = TtlCache::new(Duration::from_millis(0));
        cache.put(EntityProfile::new("Sletty"));
        assert!(cache.get("Sletty").is_none());
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.put(EntityProfile::new("Sletty"));
        cache.invalidate("Sletty");
        assert!(cache.get("Sletty").is_none());
    }

    #[test]
    fn put_refreshes_existing_entry() {
        let cache = TtlCache::new(Duration::from_secs(60));
        let mut profile = EntityProfile::new("Sletty");
        cache.put(profile.clone());

        profile.bump_counter(logbard_core::profile::EventKind::Taming);
        cache.put(profile);

        let cached = cache.get("Sletty").unwrap();
        assert_eq!(
            cached.counter(logbard_core::profile::EventKind::Taming),
            1
        );
    }

    #[test]
    fn noop_cache_never_hits() {
        let cache = NoopCache;
        cache.put(EntityProfile::new("Sletty"));
        assert!(cache.get("Sletty").is_none());
    }
}
