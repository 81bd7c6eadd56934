//! Seat registration
//!
//! Moves one seat between a conference's pool and a profile's attend-set.
//! Both rows change in one SQLite transaction; a transaction aborted by lock
//! contention is re-run as a whole by [`retry_on_contention`].
//!
//! Seat counter writes are guarded in SQL so a stale read can never push the
//! counter outside `0..=max_attendees`.

use confcentral_common::config::RetrySettings;
use confcentral_common::db::retry_on_contention;
use confcentral_common::{Error, Result};
use sqlx::SqlitePool;

use super::conferences::fetch_conference;
use super::profiles::{ensure_profile, save_attend_set};

/// Register `user_id` for a conference
///
/// Returns `true` on success. Fails with `NotFound` for an unknown conference
/// and `Conflict` if already registered or sold out.
pub async fn register(
    pool: &SqlitePool,
    retry: RetrySettings,
    user_id: &str,
    conference_id: &str,
) -> Result<bool> {
    retry_on_contention("register", retry, || {
        register_once(pool, user_id, conference_id)
    })
    .await
}

async fn register_once(pool: &SqlitePool, user_id: &str, conference_id: &str) -> Result<bool> {
    let mut tx = pool.begin().await?;

    let mut profile = ensure_profile(&mut tx, user_id).await?;
    let conference = fetch_conference(&mut tx, conference_id)
        .await?
        .ok_or_else(|| {
            Error::NotFound(format!("No conference found with key: {}", conference_id))
        })?;

    if profile.is_attending(&conference.id) {
        return Err(Error::Conflict(
            "You have already registered for this conference".to_string(),
        ));
    }
    if conference.seats_available <= 0 {
        return Err(Error::Conflict("There are no seats available.".to_string()));
    }

    let claimed = sqlx::query(
        "UPDATE conferences SET seats_available = seats_available - 1 \
         WHERE id = ? AND seats_available > 0",
    )
    .bind(&conference.id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if claimed == 0 {
        return Err(Error::Conflict("There are no seats available.".to_string()));
    }

    profile.conference_keys_to_attend.push(conference.id.clone());
    save_attend_set(&mut tx, &profile).await?;

    tx.commit().await?;

    tracing::info!(
        user_id,
        conference_id = %conference.id,
        seats_available = conference.seats_available - 1,
        "Registered for conference"
    );
    Ok(true)
}

/// Unregister `user_id` from a conference
///
/// Returns `false` without changing anything if the user was not registered.
pub async fn unregister(
    pool: &SqlitePool,
    retry: RetrySettings,
    user_id: &str,
    conference_id: &str,
) -> Result<bool> {
    retry_on_contention("unregister", retry, || {
        unregister_once(pool, user_id, conference_id)
    })
    .await
}

async fn unregister_once(pool: &SqlitePool, user_id: &str, conference_id: &str) -> Result<bool> {
    let mut tx = pool.begin().await?;

    let mut profile = ensure_profile(&mut tx, user_id).await?;
    let conference = fetch_conference(&mut tx, conference_id)
        .await?
        .ok_or_else(|| {
            Error::NotFound(format!("No conference found with key: {}", conference_id))
        })?;

    if !profile.is_attending(&conference.id) {
        // Commit so a lazily created profile persists
        tx.commit().await?;
        return Ok(false);
    }

    profile
        .conference_keys_to_attend
        .retain(|key| key != &conference.id);
    save_attend_set(&mut tx, &profile).await?;

    let released = sqlx::query(
        "UPDATE conferences SET seats_available = seats_available + 1 \
         WHERE id = ? AND seats_available < max_attendees",
    )
    .bind(&conference.id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if released == 0 {
        tracing::warn!(
            conference_id = %conference.id,
            "Seat counter already at capacity while releasing a registration"
        );
    }

    tx.commit().await?;

    tracing::info!(user_id, conference_id = %conference.id, "Unregistered from conference");
    Ok(true)
}
