//! Conference sessions

use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use confcentral_common::db::{encode_list, Session};
use confcentral_common::{keys, Error, Result};
use serde::Deserialize;
use sqlx::SqlitePool;

use super::conferences::fetch_conference;
use super::featured_speakers;
use crate::cache::ViewCache;

/// Longest accepted session, in minutes
pub const MAX_SESSION_MINUTES: i64 = 24 * 60;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionForm {
    pub name: Option<String>,
    pub highlights: Option<Vec<String>>,
    pub speaker: Option<String>,
    pub type_of_session: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    /// Minutes
    pub duration: Option<i64>,
}

/// Create a session in a conference owned by `user_id`
///
/// After the insert commits, the speaker's featured roster is refreshed in
/// `cache`; that refresh never fails the creation.
pub async fn create_session(
    pool: &SqlitePool,
    cache: &dyn ViewCache,
    featured_ttl: Option<Duration>,
    user_id: &str,
    conference_id: &str,
    form: SessionForm,
) -> Result<Session> {
    let mut conn = pool.acquire().await?;
    let conference = fetch_conference(&mut conn, conference_id)
        .await?
        .ok_or_else(|| {
            Error::NotFound(format!("No conference found with key: {}", conference_id))
        })?;

    if conference.organizer_user_id != user_id {
        return Err(Error::Forbidden(
            "Only the owner can add sessions to the conference.".to_string(),
        ));
    }

    let name = form
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| Error::InvalidInput("Session 'name' field required".to_string()))?;

    let duration = form.duration.unwrap_or(0);
    if !(0..=MAX_SESSION_MINUTES).contains(&duration) {
        return Err(Error::InvalidInput(format!(
            "duration must be between 0 and {} minutes",
            MAX_SESSION_MINUTES
        )));
    }

    let session = Session {
        id: keys::generate(),
        conference_id: conference.id,
        name,
        highlights: form.highlights.unwrap_or_default(),
        speaker: form.speaker.map(|s| s.trim().to_string()).unwrap_or_default(),
        type_of_session: form.type_of_session.unwrap_or_default(),
        start_date: form.start_date,
        start_time: form.start_time,
        duration,
    };

    sqlx::query(
        r#"
        INSERT INTO sessions (
            id, conference_id, name, highlights, speaker, type_of_session,
            start_date, start_time, duration
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&session.id)
    .bind(&session.conference_id)
    .bind(&session.name)
    .bind(encode_list(&session.highlights)?)
    .bind(&session.speaker)
    .bind(&session.type_of_session)
    .bind(session.start_date)
    .bind(session.start_time)
    .bind(session.duration)
    .execute(&mut *conn)
    .await?;
    drop(conn);

    tracing::info!(
        session_id = %session.id,
        conference_id = %session.conference_id,
        speaker = %session.speaker,
        "Created session"
    );

    featured_speakers::on_session_created(pool, cache, featured_ttl, &session).await;

    Ok(session)
}

pub async fn get_session(pool: &SqlitePool, id: &str) -> Result<Session> {
    let not_found = || Error::NotFound(format!("No session found with key: {}", id));
    if !keys::is_well_formed(id) {
        return Err(not_found());
    }

    let sql = format!("SELECT {} FROM sessions WHERE id = ?", Session::COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(not_found)?;

    Session::from_row(&row)
}

/// Sessions of a conference in creation order
pub async fn conference_sessions(pool: &SqlitePool, conference_id: &str) -> Result<Vec<Session>> {
    ensure_conference_exists(pool, conference_id).await?;

    let sql = format!(
        "SELECT {} FROM sessions WHERE conference_id = ? ORDER BY rowid",
        Session::COLUMNS
    );
    let rows = sqlx::query(&sql).bind(conference_id).fetch_all(pool).await?;
    rows.iter().map(Session::from_row).collect()
}

pub async fn conference_sessions_by_type(
    pool: &SqlitePool,
    conference_id: &str,
    type_of_session: &str,
) -> Result<Vec<Session>> {
    ensure_conference_exists(pool, conference_id).await?;

    let sql = format!(
        "SELECT {} FROM sessions WHERE conference_id = ? AND type_of_session = ? ORDER BY rowid",
        Session::COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(conference_id)
        .bind(type_of_session)
        .fetch_all(pool)
        .await?;
    rows.iter().map(Session::from_row).collect()
}

/// Sessions given by `speaker` across all conferences
pub async fn sessions_by_speaker(pool: &SqlitePool, speaker: &str) -> Result<Vec<Session>> {
    let sql = format!(
        "SELECT {} FROM sessions WHERE speaker = ? ORDER BY rowid",
        Session::COLUMNS
    );
    let rows = sqlx::query(&sql).bind(speaker).fetch_all(pool).await?;
    rows.iter().map(Session::from_row).collect()
}

/// Sessions not of `type_of_session` that end strictly before `end_time`
///
/// Sessions without a start time, or running past midnight, never match.
pub async fn sessions_not_of_type_before(
    pool: &SqlitePool,
    type_of_session: &str,
    end_time: NaiveTime,
) -> Result<Vec<Session>> {
    let sql = format!(
        "SELECT {} FROM sessions \
         WHERE type_of_session != ? AND start_time IS NOT NULL \
         ORDER BY start_time, name",
        Session::COLUMNS
    );
    let rows = sqlx::query(&sql).bind(type_of_session).fetch_all(pool).await?;

    let mut matching = Vec::new();
    for row in &rows {
        let session = Session::from_row(row)?;
        if session.end_time().is_some_and(|end| end < end_time) {
            matching.push(session);
        }
    }
    Ok(matching)
}

async fn ensure_conference_exists(pool: &SqlitePool, conference_id: &str) -> Result<()> {
    let mut conn = pool.acquire().await?;
    match fetch_conference(&mut conn, conference_id).await? {
        Some(_) => Ok(()),
        None => Err(Error::NotFound(format!(
            "No conference found with key: {}",
            conference_id
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryViewCache;
    use crate::services::conferences::create_conference;
    use crate::services::test_support::{form, test_pool};

    fn session(name: &str, kind: &str, speaker: &str, start: Option<(u32, u32)>, duration: i64) -> SessionForm {
        SessionForm {
            name: Some(name.into()),
            speaker: Some(speaker.into()),
            type_of_session: Some(kind.into()),
            start_time: start.and_then(|(h, m)| NaiveTime::from_hms_opt(h, m, 0)),
            duration: Some(duration),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_only_owner_creates_sessions() {
        let (_dir, pool) = test_pool().await;
        let cache = InMemoryViewCache::new();
        let conf = create_conference(&pool, "org", form("RustConf", "Portland", 10))
            .await
            .unwrap();

        let result = create_session(
            &pool,
            &cache,
            None,
            "mallory",
            &conf.id,
            session("Intro", "Talk", "", None, 30),
        )
        .await;
        assert!(matches!(result, Err(Error::Forbidden(_))));

        let result = create_session(
            &pool,
            &cache,
            None,
            "org",
            &keys::generate(),
            session("Intro", "Talk", "", None, 30),
        )
        .await;
        assert!(matches!(result, Err(Error::NotFound(_))));

        let created = create_session(
            &pool,
            &cache,
            None,
            "org",
            &conf.id,
            session("Intro", "Talk", "", None, 30),
        )
        .await
        .unwrap();
        assert_eq!(get_session(&pool, &created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_session_validation() {
        let (_dir, pool) = test_pool().await;
        let cache = InMemoryViewCache::new();
        let conf = create_conference(&pool, "org", form("RustConf", "Portland", 10))
            .await
            .unwrap();

        let result = create_session(&pool, &cache, None, "org", &conf.id, SessionForm::default()).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));

        let result = create_session(
            &pool,
            &cache,
            None,
            "org",
            &conf.id,
            session("Negative", "Talk", "", None, -5),
        )
        .await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));

        let result = create_session(
            &pool,
            &cache,
            None,
            "org",
            &conf.id,
            session("Endless", "Talk", "", Some((9, 0)), i64::MAX / 2),
        )
        .await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));

        let full_day = create_session(
            &pool,
            &cache,
            None,
            "org",
            &conf.id,
            session("Hackathon", "Workshop", "", Some((0, 0)), MAX_SESSION_MINUTES),
        )
        .await;
        assert!(full_day.is_ok());
    }

    #[tokio::test]
    async fn test_session_listings() {
        let (_dir, pool) = test_pool().await;
        let cache = InMemoryViewCache::new();
        let conf = create_conference(&pool, "org", form("RustConf", "Portland", 10))
            .await
            .unwrap();
        let other = create_conference(&pool, "org", form("GoConf", "Denver", 10))
            .await
            .unwrap();

        for (conf_id, form) in [
            (&conf.id, session("Keynote", "Keynote", "Ada", Some((9, 0)), 60)),
            (&conf.id, session("Async", "Workshop", "Grace", Some((10, 0)), 120)),
            (&conf.id, session("Lunch Talk", "Talk", "Ada", Some((12, 0)), 45)),
            (&other.id, session("Goroutines", "Workshop", "Ada", None, 90)),
        ] {
            create_session(&pool, &cache, None, "org", conf_id, form).await.unwrap();
        }

        let all: Vec<String> = conference_sessions(&pool, &conf.id)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(all, vec!["Keynote", "Async", "Lunch Talk"]);

        let workshops = conference_sessions_by_type(&pool, &conf.id, "Workshop").await.unwrap();
        assert_eq!(workshops.len(), 1);
        assert_eq!(workshops[0].name, "Async");

        let ada = sessions_by_speaker(&pool, "Ada").await.unwrap();
        assert_eq!(ada.len(), 3);

        let result = conference_sessions(&pool, &keys::generate()).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_sessions_not_of_type_before() {
        let (_dir, pool) = test_pool().await;
        let cache = InMemoryViewCache::new();
        let conf = create_conference(&pool, "org", form("RustConf", "Portland", 10))
            .await
            .unwrap();

        for form in [
            session("Early Talk", "Talk", "", Some((9, 0)), 60),
            session("Early Workshop", "Workshop", "", Some((8, 0)), 60),
            session("Long Talk", "Talk", "", Some((16, 0)), 180),
            session("Exact Talk", "Talk", "", Some((17, 0)), 60),
            session("Unscheduled", "Talk", "", None, 10),
        ] {
            create_session(&pool, &cache, None, "org", &conf.id, form).await.unwrap();
        }

        let cutoff = NaiveTime::from_hms_opt(18, 0, 0).unwrap();
        let names: Vec<String> = sessions_not_of_type_before(&pool, "Workshop", cutoff)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();

        assert_eq!(names, vec!["Early Talk"]);
    }

    #[tokio::test]
    async fn test_stored_oversized_duration_does_not_break_listing() {
        let (_dir, pool) = test_pool().await;
        let cache = InMemoryViewCache::new();
        let conf = create_conference(&pool, "org", form("RustConf", "Portland", 10))
            .await
            .unwrap();
        create_session(&pool, &cache, None, "org", &conf.id, session("Short", "Talk", "", Some((9, 0)), 30))
            .await
            .unwrap();
        let long = create_session(&pool, &cache, None, "org", &conf.id, session("Long", "Talk", "", Some((9, 0)), 30))
            .await
            .unwrap();

        // Rows written before the duration limit existed
        sqlx::query("UPDATE sessions SET duration = ? WHERE id = ?")
            .bind(i64::MAX / 2)
            .bind(&long.id)
            .execute(&pool)
            .await
            .unwrap();

        let cutoff = NaiveTime::from_hms_opt(23, 0, 0).unwrap();
        let names: Vec<String> = sessions_not_of_type_before(&pool, "Keynote", cutoff)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Short"]);
    }
}
