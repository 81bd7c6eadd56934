//! Conference creation, update and lookup

use chrono::NaiveDate;
use confcentral_common::config::RetrySettings;
use confcentral_common::db::{encode_list, month_of, retry_on_contention, Conference};
use confcentral_common::{keys, Error, Result};
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};

use super::profiles;

const DEFAULT_CITY: &str = "Default City";
const DEFAULT_TOPICS: [&str; 2] = ["Default", "Topic"];

/// Conference fields supplied by an organizer
///
/// On create, absent fields take defaults; on update, absent fields are left
/// unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConferenceForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub city: Option<String>,
    pub topics: Option<Vec<String>>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub max_attendees: Option<i64>,
}

/// Fetch a conference on an existing connection or transaction
pub async fn fetch_conference(conn: &mut SqliteConnection, id: &str) -> Result<Option<Conference>> {
    if !keys::is_well_formed(id) {
        return Ok(None);
    }

    let sql = format!("SELECT {} FROM conferences WHERE id = ?", Conference::COLUMNS);
    let row = sqlx::query(&sql).bind(id).fetch_optional(&mut *conn).await?;

    row.as_ref().map(Conference::from_row).transpose()
}

pub async fn get_conference(pool: &SqlitePool, id: &str) -> Result<Conference> {
    let mut conn = pool.acquire().await?;
    fetch_conference(&mut conn, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("No conference found with key: {}", id)))
}

/// Create a conference owned by `user_id`
///
/// `seats_available` starts equal to `max_attendees`.
pub async fn create_conference(
    pool: &SqlitePool,
    user_id: &str,
    form: ConferenceForm,
) -> Result<Conference> {
    let name = form
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| Error::InvalidInput("Conference 'name' field required".to_string()))?;

    let max_attendees = form.max_attendees.unwrap_or(0);
    if max_attendees < 0 {
        return Err(Error::InvalidInput(
            "max_attendees must not be negative".to_string(),
        ));
    }

    let city = form
        .city
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_CITY.to_string());
    let topics = form
        .topics
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect());

    let conference = Conference {
        id: keys::generate(),
        organizer_user_id: user_id.to_string(),
        name,
        description: form.description,
        city,
        topics,
        start_date: form.start_date,
        end_date: form.end_date,
        month: month_of(form.start_date),
        max_attendees,
        seats_available: max_attendees,
    };

    sqlx::query(
        r#"
        INSERT INTO conferences (
            id, organizer_user_id, name, description, city, topics,
            start_date, end_date, month, max_attendees, seats_available
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&conference.id)
    .bind(&conference.organizer_user_id)
    .bind(&conference.name)
    .bind(&conference.description)
    .bind(&conference.city)
    .bind(encode_list(&conference.topics)?)
    .bind(conference.start_date)
    .bind(conference.end_date)
    .bind(conference.month)
    .bind(conference.max_attendees)
    .bind(conference.seats_available)
    .execute(pool)
    .await?;

    // Confirmation email dispatch is handled outside this service
    tracing::info!(
        conference_id = %conference.id,
        organizer = user_id,
        max_attendees,
        "Created conference"
    );

    Ok(conference)
}

/// Update the provided fields of a conference owned by `user_id`
///
/// Runs in one transaction with contention retry. Changing `max_attendees`
/// keeps the seats already taken: `seats_available` becomes the new capacity
/// minus registered seats, and a capacity below that count is a Conflict.
pub async fn update_conference(
    pool: &SqlitePool,
    retry: RetrySettings,
    user_id: &str,
    id: &str,
    form: ConferenceForm,
) -> Result<Conference> {
    retry_on_contention("update_conference", retry, || {
        update_conference_once(pool, user_id, id, &form)
    })
    .await
}

async fn update_conference_once(
    pool: &SqlitePool,
    user_id: &str,
    id: &str,
    form: &ConferenceForm,
) -> Result<Conference> {
    let mut tx = pool.begin().await?;

    let mut conf = fetch_conference(&mut tx, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("No conference found with key: {}", id)))?;

    if conf.organizer_user_id != user_id {
        return Err(Error::Forbidden(
            "Only the owner can update the conference.".to_string(),
        ));
    }

    if let Some(name) = form.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        conf.name = name.to_string();
    }
    if let Some(description) = &form.description {
        conf.description = Some(description.clone());
    }
    if let Some(city) = form.city.as_ref().filter(|c| !c.is_empty()) {
        conf.city = city.clone();
    }
    if let Some(topics) = form.topics.as_ref().filter(|t| !t.is_empty()) {
        conf.topics = topics.clone();
    }
    if let Some(start_date) = form.start_date {
        conf.start_date = Some(start_date);
        conf.month = month_of(Some(start_date));
    }
    if let Some(end_date) = form.end_date {
        conf.end_date = Some(end_date);
    }
    if let Some(max_attendees) = form.max_attendees {
        let taken = conf.seats_taken();
        if max_attendees < taken {
            return Err(Error::Conflict(format!(
                "Cannot reduce capacity to {}: {} seats already registered",
                max_attendees, taken
            )));
        }
        conf.max_attendees = max_attendees;
        conf.seats_available = max_attendees - taken;
    }

    sqlx::query(
        r#"
        UPDATE conferences SET
            name = ?, description = ?, city = ?, topics = ?, start_date = ?,
            end_date = ?, month = ?, max_attendees = ?, seats_available = ?
        WHERE id = ?
        "#,
    )
    .bind(&conf.name)
    .bind(&conf.description)
    .bind(&conf.city)
    .bind(encode_list(&conf.topics)?)
    .bind(conf.start_date)
    .bind(conf.end_date)
    .bind(conf.month)
    .bind(conf.max_attendees)
    .bind(conf.seats_available)
    .bind(&conf.id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(conference_id = %conf.id, "Updated conference");
    Ok(conf)
}

/// Conferences organized by `user_id`, ordered by name
pub async fn conferences_created_by(pool: &SqlitePool, user_id: &str) -> Result<Vec<Conference>> {
    let sql = format!(
        "SELECT {} FROM conferences WHERE organizer_user_id = ? ORDER BY name, id",
        Conference::COLUMNS
    );
    let rows = sqlx::query(&sql).bind(user_id).fetch_all(pool).await?;

    rows.iter().map(Conference::from_row).collect()
}

/// Conferences the user registered for, in registration order
///
/// Creates the profile on first access. Ids that no longer resolve are skipped.
pub async fn conferences_to_attend(pool: &SqlitePool, user_id: &str) -> Result<Vec<Conference>> {
    let mut conn = pool.acquire().await?;
    let profile = profiles::ensure_profile(&mut conn, user_id).await?;

    let mut conferences = Vec::with_capacity(profile.conference_keys_to_attend.len());
    for key in &profile.conference_keys_to_attend {
        match fetch_conference(&mut conn, key).await? {
            Some(conf) => conferences.push(conf),
            None => tracing::debug!(conference_id = %key, "Skipping unresolved attend-set entry"),
        }
    }

    Ok(conferences)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{form, test_pool};

    #[tokio::test]
    async fn test_create_applies_defaults() {
        let (_dir, pool) = test_pool().await;

        let conf = create_conference(
            &pool,
            "alice",
            ConferenceForm {
                name: Some("RustConf".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(conf.city, "Default City");
        assert_eq!(conf.topics, vec!["Default", "Topic"]);
        assert_eq!(conf.max_attendees, 0);
        assert_eq!(conf.seats_available, 0);
        assert_eq!(conf.month, 0);

        let stored = get_conference(&pool, &conf.id).await.unwrap();
        assert_eq!(stored, conf);
    }

    #[tokio::test]
    async fn test_create_sets_seats_and_month() {
        let (_dir, pool) = test_pool().await;

        let mut f = form("RustConf", "Portland", 50);
        f.start_date = NaiveDate::from_ymd_opt(2026, 9, 8);
        let conf = create_conference(&pool, "alice", f).await.unwrap();

        assert_eq!(conf.seats_available, 50);
        assert_eq!(conf.month, 9);
    }

    #[tokio::test]
    async fn test_create_requires_name() {
        let (_dir, pool) = test_pool().await;

        let result = create_conference(&pool, "alice", ConferenceForm::default()).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));

        let result = create_conference(&pool, "alice", form("  ", "Paris", 1)).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_get_missing_conference() {
        let (_dir, pool) = test_pool().await;

        let result = get_conference(&pool, &keys::generate()).await;
        assert!(matches!(result, Err(Error::NotFound(_))));

        let result = get_conference(&pool, "garbage").await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_by_non_owner_is_forbidden() {
        let (_dir, pool) = test_pool().await;
        let conf = create_conference(&pool, "alice", form("RustConf", "Portland", 10))
            .await
            .unwrap();

        let result = update_conference(
            &pool,
            RetrySettings::default(),
            "mallory",
            &conf.id,
            form("Hijacked", "Nowhere", 1),
        )
        .await;

        assert!(matches!(result, Err(Error::Forbidden(_))));
        assert_eq!(get_conference(&pool, &conf.id).await.unwrap().name, "RustConf");
    }

    #[tokio::test]
    async fn test_update_partial_fields_and_month() {
        let (_dir, pool) = test_pool().await;
        let conf = create_conference(&pool, "alice", form("RustConf", "Portland", 10))
            .await
            .unwrap();

        let updated = update_conference(
            &pool,
            RetrySettings::default(),
            "alice",
            &conf.id,
            ConferenceForm {
                city: Some("Montreal".into()),
                start_date: NaiveDate::from_ymd_opt(2026, 4, 20),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.name, "RustConf");
        assert_eq!(updated.city, "Montreal");
        assert_eq!(updated.month, 4);
        assert_eq!(get_conference(&pool, &conf.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_update_capacity_preserves_taken_seats() {
        let (_dir, pool) = test_pool().await;
        let conf = create_conference(&pool, "alice", form("RustConf", "Portland", 10))
            .await
            .unwrap();
        sqlx::query("UPDATE conferences SET seats_available = 6 WHERE id = ?")
            .bind(&conf.id)
            .execute(&pool)
            .await
            .unwrap();

        let grow = ConferenceForm {
            max_attendees: Some(20),
            ..Default::default()
        };
        let updated = update_conference(&pool, RetrySettings::default(), "alice", &conf.id, grow)
            .await
            .unwrap();
        assert_eq!(updated.max_attendees, 20);
        assert_eq!(updated.seats_available, 16);

        let shrink_too_far = ConferenceForm {
            max_attendees: Some(3),
            ..Default::default()
        };
        let result =
            update_conference(&pool, RetrySettings::default(), "alice", &conf.id, shrink_too_far)
                .await;
        assert!(matches!(result, Err(Error::Conflict(_))));
    }

    #[tokio::test]
    async fn test_conferences_created_by_orders_by_name() {
        let (_dir, pool) = test_pool().await;
        create_conference(&pool, "alice", form("Zeta", "Oslo", 1)).await.unwrap();
        create_conference(&pool, "alice", form("Alpha", "Oslo", 1)).await.unwrap();
        create_conference(&pool, "bob", form("Beta", "Oslo", 1)).await.unwrap();

        let names: Vec<String> = conferences_created_by(&pool, "alice")
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
    }
}
