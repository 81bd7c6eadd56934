//! Session wishlists
//!
//! A wishlist entry links a profile to a session. Entries are deduplicated
//! by a conditional insert, and resolved against the sessions table on read.

use std::collections::HashMap;

use confcentral_common::db::{Session, WishlistEntry};
use confcentral_common::{keys, Error, Result};
use sqlx::SqlitePool;

use super::profiles::find_profile;
use super::sessions::get_session;

/// Add a session to the user's wishlist and return the whole wishlist
///
/// Fails with `NotFound` if the session does not exist or the user has no
/// profile. Adding a session twice leaves one entry.
pub async fn add_to_wishlist(
    pool: &SqlitePool,
    user_id: &str,
    session_id: &str,
) -> Result<Vec<Session>> {
    let session = get_session(pool, session_id).await?;

    let mut conn = pool.acquire().await?;
    let profile = find_profile(&mut conn, user_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("No profile found for user: {}", user_id)))?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO wishlist_entries (id, profile_id, session_id)
        SELECT ?, ?, ?
        WHERE NOT EXISTS (
            SELECT 1 FROM wishlist_entries WHERE profile_id = ? AND session_id = ?
        )
        "#,
    )
    .bind(keys::generate())
    .bind(&profile.user_id)
    .bind(&session.id)
    .bind(&profile.user_id)
    .bind(&session.id)
    .execute(&mut *conn)
    .await?
    .rows_affected();
    drop(conn);

    if inserted > 0 {
        tracing::info!(user_id, session_id = %session.id, "Added session to wishlist");
    } else {
        tracing::debug!(user_id, session_id = %session.id, "Session already in wishlist");
    }

    list_wishlist(pool, user_id).await
}

/// Sessions on the user's wishlist, in the order they were added
///
/// Entries whose session no longer exists are skipped.
pub async fn list_wishlist(pool: &SqlitePool, user_id: &str) -> Result<Vec<Session>> {
    let sql = format!(
        "SELECT {} FROM wishlist_entries WHERE profile_id = ? ORDER BY rowid",
        WishlistEntry::COLUMNS
    );
    let entries = sqlx::query(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await?
        .iter()
        .map(WishlistEntry::from_row)
        .collect::<Result<Vec<_>>>()?;

    if entries.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT {} FROM sessions \
         WHERE id IN (SELECT session_id FROM wishlist_entries WHERE profile_id = ?)",
        Session::COLUMNS
    );
    let mut sessions = sqlx::query(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await?
        .iter()
        .map(|row| Session::from_row(row).map(|session| (session.id.clone(), session)))
        .collect::<Result<HashMap<_, _>>>()?;

    let mut resolved = Vec::with_capacity(entries.len());
    for entry in &entries {
        match sessions.remove(&entry.session_id) {
            Some(session) => resolved.push(session),
            None => tracing::debug!(
                entry_id = %entry.id,
                session_id = %entry.session_id,
                "Skipping wishlist entry for missing session"
            ),
        }
    }
    Ok(resolved)
}
