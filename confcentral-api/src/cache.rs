//! Derived-view cache
//!
//! Fast, non-authoritative storage for aggregates computed from the database
//! (nearly-sold-out announcement, featured speakers). Any entry may be absent
//! at any time; callers treat a miss as a valid answer and never wait for a
//! recomputation.
//!
//! Keys are typed ([`CacheKey`]) with canonical string forms:
//! - `announcement`
//! - `featuredSpeaker:{speaker}:{conference}`
//! - `featuredSpeakerIndex`

use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

/// Key schema of the derived-view cache
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Process-wide nearly-sold-out announcement
    Announcement,
    /// Session roster of one speaker within one conference
    FeaturedSpeaker {
        speaker: String,
        conference_id: String,
    },
    /// Set of (speaker, conference) pairs with a published roster
    FeaturedSpeakerIndex,
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Announcement => write!(f, "announcement"),
            CacheKey::FeaturedSpeaker {
                speaker,
                conference_id,
            } => write!(f, "featuredSpeaker:{}:{}", speaker, conference_id),
            CacheKey::FeaturedSpeakerIndex => write!(f, "featuredSpeakerIndex"),
        }
    }
}

/// Cache service interface
///
/// Values are opaque strings (JSON for structured views). `ttl = None` means
/// the entry does not expire, though an implementation may still evict it.
pub trait ViewCache: Send + Sync {
    /// Current value, or `None` if absent or expired
    fn get(&self, key: &CacheKey) -> Option<String>;

    fn set(&self, key: &CacheKey, value: String, ttl: Option<Duration>);

    fn delete(&self, key: &CacheKey);

    /// Atomic read-modify-write
    ///
    /// `f` receives the current value and returns the replacement; returning
    /// `None` removes the entry. No other writer can interleave between the
    /// read and the write.
    fn update(
        &self,
        key: &CacheKey,
        ttl: Option<Duration>,
        f: &mut dyn FnMut(Option<String>) -> Option<String>,
    );
}

#[derive(Debug, Clone)]
struct CachedValue {
    value: String,
    expires_at: Option<Instant>,
}

impl CachedValue {
    fn new(value: String, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// In-process [`ViewCache`] backed by a `HashMap`
///
/// Locks are held only for the map operation itself.
#[derive(Debug, Default)]
pub struct InMemoryViewCache {
    entries: RwLock<HashMap<String, CachedValue>>,
}

impl InMemoryViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ViewCache for InMemoryViewCache {
    fn get(&self, key: &CacheKey) -> Option<String> {
        let now = Instant::now();
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key.to_string())
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone())
    }

    fn set(&self, key: &CacheKey, value: String, ttl: Option<Duration>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        entries.retain(|_, entry| entry.is_live(now));
        entries.insert(key.to_string(), CachedValue::new(value, ttl));
    }

    fn delete(&self, key: &CacheKey) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key.to_string());
    }

    fn update(
        &self,
        key: &CacheKey,
        ttl: Option<Duration>,
        f: &mut dyn FnMut(Option<String>) -> Option<String>,
    ) {
        let key = key.to_string();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        let current = entries
            .get(&key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone());

        match f(current) {
            Some(value) => {
                entries.insert(key, CachedValue::new(value, ttl));
            }
            None => {
                entries.remove(&key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_strings() {
        assert_eq!(CacheKey::Announcement.to_string(), "announcement");
        assert_eq!(CacheKey::FeaturedSpeakerIndex.to_string(), "featuredSpeakerIndex");
        let key = CacheKey::FeaturedSpeaker {
            speaker: "Ada".into(),
            conference_id: "c1".into(),
        };
        assert_eq!(key.to_string(), "featuredSpeaker:Ada:c1");
    }

    #[test]
    fn test_set_get_delete() {
        let cache = InMemoryViewCache::new();
        assert!(cache.get(&CacheKey::Announcement).is_none());

        cache.set(&CacheKey::Announcement, "hello".into(), None);
        assert_eq!(cache.get(&CacheKey::Announcement).as_deref(), Some("hello"));

        cache.delete(&CacheKey::Announcement);
        assert!(cache.get(&CacheKey::Announcement).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_expired_entry_reads_as_absent() {
        let cache = InMemoryViewCache::new();
        cache.set(&CacheKey::Announcement, "soon gone".into(), Some(Duration::ZERO));
        assert!(cache.get(&CacheKey::Announcement).is_none());
        assert_eq!(cache.len(), 0);

        cache.set(&CacheKey::Announcement, "kept".into(), Some(Duration::from_secs(60)));
        assert_eq!(cache.get(&CacheKey::Announcement).as_deref(), Some("kept"));
    }

    #[test]
    fn test_update_is_read_modify_write() {
        let cache = InMemoryViewCache::new();
        let key = CacheKey::FeaturedSpeakerIndex;

        cache.update(&key, None, &mut |current| {
            assert!(current.is_none());
            Some("1".into())
        });
        cache.update(&key, None, &mut |current| {
            let n: u32 = current.unwrap().parse().unwrap();
            Some((n + 1).to_string())
        });
        assert_eq!(cache.get(&key).as_deref(), Some("2"));

        cache.update(&key, None, &mut |_| None);
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn test_concurrent_updates_do_not_lose_writes() {
        use std::sync::Arc;

        let cache = Arc::new(InMemoryViewCache::new());
        let key = CacheKey::FeaturedSpeakerIndex;
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let key = key.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        cache.update(&key, None, &mut |current| {
                            let n: u32 = current.map_or(0, |v| v.parse().unwrap());
                            Some((n + 1).to_string())
                        });
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.get(&key).as_deref(), Some("800"));
    }
}
