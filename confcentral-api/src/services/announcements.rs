//! Nearly-sold-out announcement
//!
//! Recomputed only by the scheduler (or the admin trigger); reads come
//! straight from the view cache.

use std::time::Duration;

use confcentral_common::Result;
use sqlx::SqlitePool;

use crate::cache::{CacheKey, ViewCache};

/// Conferences with this many seats or fewer (but at least one) are announced
pub const NEARLY_SOLD_OUT_SEATS: i64 = 5;

const ANNOUNCEMENT_PREFIX: &str =
    "Last chance to attend! The following conferences are nearly sold out: ";

/// Rebuild the announcement from the store and publish it
///
/// Clears the cached announcement when no conference qualifies.
pub async fn recompute_announcement(
    pool: &SqlitePool,
    cache: &dyn ViewCache,
    ttl: Option<Duration>,
) -> Result<Option<String>> {
    let names: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM conferences \
         WHERE seats_available > 0 AND seats_available <= ? \
         ORDER BY name",
    )
    .bind(NEARLY_SOLD_OUT_SEATS)
    .fetch_all(pool)
    .await?;

    if names.is_empty() {
        cache.delete(&CacheKey::Announcement);
        tracing::debug!("No nearly sold out conferences; announcement cleared");
        return Ok(None);
    }

    let announcement = format!("{}{}", ANNOUNCEMENT_PREFIX, names.join(", "));
    cache.set(&CacheKey::Announcement, announcement.clone(), ttl);

    tracing::info!(conferences = names.len(), "Announcement updated");
    Ok(Some(announcement))
}

/// Current announcement, if one is published
pub fn get_announcement(cache: &dyn ViewCache) -> Option<String> {
    cache.get(&CacheKey::Announcement)
}
