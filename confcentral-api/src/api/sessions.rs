//! Session endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveTime;
use confcentral_common::db::Session;
use serde::Deserialize;

use super::{ApiError, UserId};
use crate::services::sessions::{self, SessionForm};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TypeQuery {
    #[serde(rename = "type")]
    pub type_of_session: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SpeakerQuery {
    pub speaker: String,
}

#[derive(Debug, Deserialize)]
pub struct NotOfTypeBeforeQuery {
    #[serde(rename = "type")]
    pub type_of_session: String,
    /// `HH:MM` or `HH:MM:SS`
    pub end_time: String,
}

/// POST /conference/:id/sessions
pub async fn create_session(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(conference_id): Path<String>,
    Json(form): Json<SessionForm>,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    let session = sessions::create_session(
        &state.db,
        state.cache.as_ref(),
        state.cache_settings.featured_speaker_ttl(),
        &user_id,
        &conference_id,
        form,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// GET /conference/:id/sessions?type=
pub async fn conference_sessions(
    State(state): State<AppState>,
    _user: UserId,
    Path(conference_id): Path<String>,
    Query(query): Query<TypeQuery>,
) -> Result<Json<Vec<Session>>, ApiError> {
    let found = match query.type_of_session.as_deref() {
        Some(kind) => sessions::conference_sessions_by_type(&state.db, &conference_id, kind).await?,
        None => sessions::conference_sessions(&state.db, &conference_id).await?,
    };
    Ok(Json(found))
}

/// GET /session/:id
pub async fn get_session(
    State(state): State<AppState>,
    _user: UserId,
    Path(id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    Ok(Json(sessions::get_session(&state.db, &id).await?))
}

/// GET /sessions/by-speaker?speaker=
pub async fn sessions_by_speaker(
    State(state): State<AppState>,
    _user: UserId,
    Query(query): Query<SpeakerQuery>,
) -> Result<Json<Vec<Session>>, ApiError> {
    Ok(Json(sessions::sessions_by_speaker(&state.db, &query.speaker).await?))
}

/// GET /sessions/not-of-type-before?type=&end_time=
pub async fn sessions_not_of_type_before(
    State(state): State<AppState>,
    _user: UserId,
    Query(query): Query<NotOfTypeBeforeQuery>,
) -> Result<Json<Vec<Session>>, ApiError> {
    let end_time = parse_time_of_day(&query.end_time)?;
    let found =
        sessions::sessions_not_of_type_before(&state.db, &query.type_of_session, end_time).await?;
    Ok(Json(found))
}

fn parse_time_of_day(raw: &str) -> Result<NaiveTime, ApiError> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|_| ApiError::BadRequest(format!("Invalid end_time: {}", raw)))
}
