//! Database initialization
//!
//! Creates the database file and schema on first run and opens existing
//! databases idempotently. All tables are created with `IF NOT EXISTS` so
//! this is safe to call on every startup.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Default SQLite busy timeout when none is configured
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 250;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    init_database_with_timeout(db_path, DEFAULT_BUSY_TIMEOUT_MS).await
}

/// Initialize database with an explicit busy timeout
///
/// The busy timeout bounds how long a connection waits on a held write lock
/// before reporting contention; the registration path retries on top of it.
pub async fn init_database_with_timeout(db_path: &Path, busy_timeout_ms: u64) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Pragmas are per-connection; set them on the options so every pooled
    // connection gets them.
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_millis(busy_timeout_ms));

    let pool = SqlitePoolOptions::new()
        .max_connections(20)
        .min_connections(1)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema_version_table(&pool).await?;
    create_profiles_table(&pool).await?;
    create_conferences_table(&pool).await?;
    create_sessions_table(&pool).await?;
    create_wishlist_entries_table(&pool).await?;

    crate::db::migrations::run_migrations(&pool).await?;

    info!("Database busy timeout set to {} ms", busy_timeout_ms);

    Ok(pool)
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the profiles table
///
/// `conference_keys_to_attend` is the attend-set: a JSON array of conference
/// ids in registration order.
pub async fn create_profiles_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS profiles (
            user_id TEXT PRIMARY KEY,
            conference_keys_to_attend TEXT NOT NULL DEFAULT '[]',
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the conferences table
///
/// `0 <= seats_available <= max_attendees` is also a table constraint.
pub async fn create_conferences_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS conferences (
            id TEXT PRIMARY KEY,
            organizer_user_id TEXT NOT NULL,
            name TEXT NOT NULL,
            description TEXT,
            city TEXT NOT NULL,
            topics TEXT NOT NULL DEFAULT '[]',
            start_date TEXT,
            end_date TEXT,
            month INTEGER NOT NULL DEFAULT 0,
            max_attendees INTEGER NOT NULL DEFAULT 0 CHECK (max_attendees >= 0),
            seats_available INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (seats_available >= 0 AND seats_available <= max_attendees)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the sessions table
pub async fn create_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            conference_id TEXT NOT NULL REFERENCES conferences(id),
            name TEXT NOT NULL,
            highlights TEXT NOT NULL DEFAULT '[]',
            speaker TEXT NOT NULL DEFAULT '',
            type_of_session TEXT NOT NULL DEFAULT '',
            start_date TEXT,
            start_time TEXT,
            duration INTEGER NOT NULL DEFAULT 0 CHECK (duration >= 0),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the wishlist_entries table
///
/// `session_id` has no foreign key: an entry may outlive the session it
/// references, and listing skips such entries.
pub async fn create_wishlist_entries_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS wishlist_entries (
            id TEXT PRIMARY KEY,
            profile_id TEXT NOT NULL REFERENCES profiles(user_id),
            session_id TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
