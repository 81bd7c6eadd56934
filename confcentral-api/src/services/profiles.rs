//! Attendee profiles
//!
//! A profile is keyed by the authenticated user id and created lazily the
//! first time any profile-touching operation runs for that user.

use confcentral_common::db::{encode_list, Profile};
use confcentral_common::Result;
use sqlx::{SqliteConnection, SqlitePool};

/// Load a profile without creating it
pub async fn find_profile(conn: &mut SqliteConnection, user_id: &str) -> Result<Option<Profile>> {
    let sql = format!("SELECT {} FROM profiles WHERE user_id = ?", Profile::COLUMNS);
    let row = sqlx::query(&sql)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(Profile::from_row).transpose()
}

/// Load a profile, creating an empty one if the user has none
///
/// Usable inside a transaction: the insert and the read run on `conn`.
pub async fn ensure_profile(conn: &mut SqliteConnection, user_id: &str) -> Result<Profile> {
    let created = sqlx::query("INSERT OR IGNORE INTO profiles (user_id) VALUES (?)")
        .bind(user_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    if created > 0 {
        tracing::info!(user_id, "Created profile");
    }

    let sql = format!("SELECT {} FROM profiles WHERE user_id = ?", Profile::COLUMNS);
    let row = sqlx::query(&sql)
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;

    Profile::from_row(&row)
}

/// Persist a profile's attend-set
pub async fn save_attend_set(conn: &mut SqliteConnection, profile: &Profile) -> Result<()> {
    sqlx::query("UPDATE profiles SET conference_keys_to_attend = ? WHERE user_id = ?")
        .bind(encode_list(&profile.conference_keys_to_attend)?)
        .bind(&profile.user_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Return the caller's profile, creating it on first access
pub async fn get_or_create_profile(pool: &SqlitePool, user_id: &str) -> Result<Profile> {
    let mut conn = pool.acquire().await?;
    ensure_profile(&mut conn, user_id).await
}
