//! Conference, profile and registration endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use confcentral_common::db::{Conference, Profile};
use serde::Deserialize;

use super::{ApiError, DataResponse, UserId};
use crate::services::conferences::{self, ConferenceForm};
use crate::services::query::{self, QueryFilter};
use crate::services::{profiles, registration};
use crate::AppState;

/// Body of POST /conferences/query
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub filters: Vec<QueryFilter>,
}

/// GET /profile
pub async fn get_profile(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> Result<Json<Profile>, ApiError> {
    let profile = profiles::get_or_create_profile(&state.db, &user_id).await?;
    Ok(Json(profile))
}

/// POST /conference
pub async fn create_conference(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(form): Json<ConferenceForm>,
) -> Result<(StatusCode, Json<Conference>), ApiError> {
    let conference = conferences::create_conference(&state.db, &user_id, form).await?;
    Ok((StatusCode::CREATED, Json(conference)))
}

/// GET /conference/:id
pub async fn get_conference(
    State(state): State<AppState>,
    _user: UserId,
    Path(id): Path<String>,
) -> Result<Json<Conference>, ApiError> {
    Ok(Json(conferences::get_conference(&state.db, &id).await?))
}

/// PUT /conference/:id
pub async fn update_conference(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(id): Path<String>,
    Json(form): Json<ConferenceForm>,
) -> Result<Json<Conference>, ApiError> {
    let conference =
        conferences::update_conference(&state.db, state.registration, &user_id, &id, form).await?;
    Ok(Json(conference))
}

/// POST /conference/:id/registration
pub async fn register(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<bool>>, ApiError> {
    let registered = registration::register(&state.db, state.registration, &user_id, &id).await?;
    Ok(Json(DataResponse::new(registered)))
}

/// DELETE /conference/:id/registration
pub async fn unregister(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<bool>>, ApiError> {
    let removed = registration::unregister(&state.db, state.registration, &user_id, &id).await?;
    Ok(Json(DataResponse::new(removed)))
}

/// GET /conferences/created
pub async fn conferences_created(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> Result<Json<Vec<Conference>>, ApiError> {
    Ok(Json(conferences::conferences_created_by(&state.db, &user_id).await?))
}

/// GET /conferences/attending
pub async fn conferences_attending(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> Result<Json<Vec<Conference>>, ApiError> {
    Ok(Json(conferences::conferences_to_attend(&state.db, &user_id).await?))
}

/// POST /conferences/query
pub async fn query_conferences(
    State(state): State<AppState>,
    _user: UserId,
    Json(request): Json<QueryRequest>,
) -> Result<Json<Vec<Conference>>, ApiError> {
    Ok(Json(query::run_query(&state.db, &request.filters).await?))
}
