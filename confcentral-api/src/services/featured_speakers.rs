//! Featured speaker rosters
//!
//! A speaker is featured in a conference once they have at least two sessions
//! there. Rosters live only in the view cache: one entry per
//! (speaker, conference) plus an index of the pairs that have an entry.
//!
//! Published rosters are not retracted when a speaker drops back to a single
//! session; they stay until the cache evicts them.

use std::time::Duration;

use confcentral_common::db::Session;
use confcentral_common::Result;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::cache::{CacheKey, ViewCache};

/// Minimum sessions in one conference for a speaker to be featured
pub const FEATURED_SESSION_THRESHOLD: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturedSpeaker {
    pub speaker: String,
    pub conference_id: String,
    /// Session names in creation order
    pub session_names: Vec<String>,
}

/// (speaker, conference) pair recorded in the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturedSpeakerRef {
    pub speaker: String,
    pub conference_id: String,
}

impl FeaturedSpeakerRef {
    fn cache_key(&self) -> CacheKey {
        CacheKey::FeaturedSpeaker {
            speaker: self.speaker.clone(),
            conference_id: self.conference_id.clone(),
        }
    }
}

/// Refresh the roster for the new session's speaker
///
/// Errors are logged and swallowed; session creation has already committed.
pub async fn on_session_created(
    pool: &SqlitePool,
    cache: &dyn ViewCache,
    ttl: Option<Duration>,
    session: &Session,
) {
    if session.speaker.is_empty() {
        return;
    }

    if let Err(e) = refresh_speaker(pool, cache, ttl, &session.speaker, &session.conference_id).await
    {
        tracing::warn!(
            speaker = %session.speaker,
            conference_id = %session.conference_id,
            error = %e,
            "Failed to refresh featured speaker"
        );
    }
}

async fn refresh_speaker(
    pool: &SqlitePool,
    cache: &dyn ViewCache,
    ttl: Option<Duration>,
    speaker: &str,
    conference_id: &str,
) -> Result<()> {
    let session_names: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sessions WHERE conference_id = ? AND speaker = ? ORDER BY rowid",
    )
    .bind(conference_id)
    .bind(speaker)
    .fetch_all(pool)
    .await?;

    if session_names.len() < FEATURED_SESSION_THRESHOLD {
        tracing::debug!(
            speaker,
            conference_id,
            sessions = session_names.len(),
            "Speaker not featured"
        );
        return Ok(());
    }

    let reference = FeaturedSpeakerRef {
        speaker: speaker.to_string(),
        conference_id: conference_id.to_string(),
    };
    let entry = FeaturedSpeaker {
        speaker: reference.speaker.clone(),
        conference_id: reference.conference_id.clone(),
        session_names,
    };

    let encoded = serde_json::to_string(&entry)?;
    let mut kept_longer = false;
    cache.update(&reference.cache_key(), ttl, &mut |current| {
        // Rosters only grow, so a longer one was computed later
        let published = current
            .as_deref()
            .and_then(|raw| serde_json::from_str::<FeaturedSpeaker>(raw).ok());
        match published {
            Some(published) if published.session_names.len() > entry.session_names.len() => {
                kept_longer = true;
                current
            }
            _ => Some(encoded.clone()),
        }
    });
    if kept_longer {
        tracing::debug!(speaker, conference_id, "Kept newer featured speaker roster");
    }

    let mut index_error = None;
    cache.update(&CacheKey::FeaturedSpeakerIndex, ttl, &mut |current| {
        let parsed = current
            .as_deref()
            .map(|raw| serde_json::from_str::<Vec<FeaturedSpeakerRef>>(raw));
        let mut index = match parsed {
            Some(Ok(index)) => index,
            Some(Err(e)) => {
                index_error = Some(e);
                Vec::new()
            }
            None => Vec::new(),
        };
        if !index.contains(&reference) {
            index.push(reference.clone());
        }
        match serde_json::to_string(&index) {
            Ok(encoded) => Some(encoded),
            Err(_) => current,
        }
    });
    if let Some(e) = index_error {
        tracing::warn!(error = %e, "Replaced unreadable featured speaker index");
    }

    tracing::info!(
        speaker,
        conference_id,
        sessions = entry.session_names.len(),
        "Published featured speaker"
    );
    Ok(())
}

/// All featured speakers recorded in the index
///
/// Index keys whose entry has been evicted are skipped.
pub fn list_featured_speakers(cache: &dyn ViewCache) -> Vec<FeaturedSpeaker> {
    let Some(raw_index) = cache.get(&CacheKey::FeaturedSpeakerIndex) else {
        return Vec::new();
    };

    let index: Vec<FeaturedSpeakerRef> = match serde_json::from_str(&raw_index) {
        Ok(index) => index,
        Err(e) => {
            tracing::warn!(error = %e, "Unreadable featured speaker index");
            return Vec::new();
        }
    };

    index
        .iter()
        .filter_map(|reference| cache.get(&reference.cache_key()))
        .filter_map(|raw| serde_json::from_str(&raw).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryViewCache;
    use crate::services::conferences::create_conference;
    use crate::services::sessions::{create_session, SessionForm};
    use crate::services::test_support::{form, test_pool};

    async fn add_session(pool: &SqlitePool, cache: &dyn ViewCache, conf: &str, name: &str, speaker: &str) {
        create_session(
            pool,
            cache,
            None,
            "org",
            conf,
            SessionForm {
                name: Some(name.into()),
                speaker: Some(speaker.into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_single_session_is_not_featured() {
        let (_dir, pool) = test_pool().await;
        let cache = InMemoryViewCache::new();
        let conf = create_conference(&pool, "org", form("RustConf", "Portland", 10))
            .await
            .unwrap();

        add_session(&pool, &cache, &conf.id, "Ownership", "Ada").await;

        assert!(list_featured_speakers(&cache).is_empty());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_second_session_publishes_full_roster() {
        let (_dir, pool) = test_pool().await;
        let cache = InMemoryViewCache::new();
        let conf = create_conference(&pool, "org", form("RustConf", "Portland", 10))
            .await
            .unwrap();

        add_session(&pool, &cache, &conf.id, "Ownership", "Ada").await;
        add_session(&pool, &cache, &conf.id, "Lifetimes", "Ada").await;
        add_session(&pool, &cache, &conf.id, "Anonymous", "").await;

        let featured = list_featured_speakers(&cache);
        assert_eq!(
            featured,
            vec![FeaturedSpeaker {
                speaker: "Ada".into(),
                conference_id: conf.id.clone(),
                session_names: vec!["Ownership".into(), "Lifetimes".into()],
            }]
        );

        add_session(&pool, &cache, &conf.id, "Traits", "Ada").await;
        let featured = list_featured_speakers(&cache);
        assert_eq!(featured.len(), 1, "index must not duplicate the pair");
        assert_eq!(featured[0].session_names, vec!["Ownership", "Lifetimes", "Traits"]);
    }

    #[tokio::test]
    async fn test_rosters_are_per_conference() {
        let (_dir, pool) = test_pool().await;
        let cache = InMemoryViewCache::new();
        let first = create_conference(&pool, "org", form("RustConf", "Portland", 10))
            .await
            .unwrap();
        let second = create_conference(&pool, "org", form("RustFest", "Zurich", 10))
            .await
            .unwrap();

        add_session(&pool, &cache, &first.id, "One", "Ada").await;
        add_session(&pool, &cache, &second.id, "Two", "Ada").await;
        assert!(list_featured_speakers(&cache).is_empty());

        add_session(&pool, &cache, &second.id, "Three", "Ada").await;
        let featured = list_featured_speakers(&cache);
        assert_eq!(featured.len(), 1);
        assert_eq!(featured[0].conference_id, second.id);
    }

    #[tokio::test]
    async fn test_stale_refresh_keeps_longer_roster() {
        let (_dir, pool) = test_pool().await;
        let cache = InMemoryViewCache::new();
        let conf = create_conference(&pool, "org", form("RustConf", "Portland", 10))
            .await
            .unwrap();
        add_session(&pool, &cache, &conf.id, "Ownership", "Ada").await;
        add_session(&pool, &cache, &conf.id, "Lifetimes", "Ada").await;

        // A concurrent refresh that saw a third session has already published
        let newer = FeaturedSpeaker {
            speaker: "Ada".into(),
            conference_id: conf.id.clone(),
            session_names: vec!["Ownership".into(), "Lifetimes".into(), "Traits".into()],
        };
        let key = CacheKey::FeaturedSpeaker {
            speaker: "Ada".into(),
            conference_id: conf.id.clone(),
        };
        cache.set(&key, serde_json::to_string(&newer).unwrap(), None);

        refresh_speaker(&pool, &cache, None, "Ada", &conf.id).await.unwrap();

        let featured = list_featured_speakers(&cache);
        assert_eq!(featured, vec![newer]);
    }

    #[tokio::test]
    async fn test_evicted_entry_is_skipped() {
        let (_dir, pool) = test_pool().await;
        let cache = InMemoryViewCache::new();
        let conf = create_conference(&pool, "org", form("RustConf", "Portland", 10))
            .await
            .unwrap();

        for (name, speaker) in [("A1", "Ada"), ("A2", "Ada"), ("G1", "Grace"), ("G2", "Grace")] {
            add_session(&pool, &cache, &conf.id, name, speaker).await;
        }
        assert_eq!(list_featured_speakers(&cache).len(), 2);

        cache.delete(&CacheKey::FeaturedSpeaker {
            speaker: "Ada".into(),
            conference_id: conf.id.clone(),
        });

        let featured = list_featured_speakers(&cache);
        assert_eq!(featured.len(), 1);
        assert_eq!(featured[0].speaker, "Grace");
    }

    #[tokio::test]
    async fn test_store_failure_does_not_propagate() {
        let (_dir, pool) = test_pool().await;
        let cache = InMemoryViewCache::new();
        pool.close().await;

        let session = Session {
            id: "s".into(),
            conference_id: "c".into(),
            name: "Orphan".into(),
            highlights: vec![],
            speaker: "Ada".into(),
            type_of_session: String::new(),
            start_date: None,
            start_time: None,
            duration: 0,
        };
        on_session_created(&pool, &cache, None, &session).await;

        assert!(cache.is_empty());
    }
}
