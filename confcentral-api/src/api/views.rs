//! Cached view endpoints
//!
//! Reads are served from the view cache only.

use axum::{extract::State, Json};

use super::{ApiError, DataResponse};
use crate::services::announcements;
use crate::services::featured_speakers::{self, FeaturedSpeaker};
use crate::AppState;

/// GET /announcement
///
/// `data` is empty when no announcement is published.
pub async fn get_announcement(State(state): State<AppState>) -> Json<DataResponse<String>> {
    let announcement = announcements::get_announcement(state.cache.as_ref()).unwrap_or_default();
    Json(DataResponse::new(announcement))
}

/// POST /tasks/announcement
pub async fn recompute_announcement(
    State(state): State<AppState>,
) -> Result<Json<DataResponse<String>>, ApiError> {
    let announcement = announcements::recompute_announcement(
        &state.db,
        state.cache.as_ref(),
        state.cache_settings.announcement_ttl(),
    )
    .await?
    .unwrap_or_default();
    Ok(Json(DataResponse::new(announcement)))
}

/// GET /featured-speakers
pub async fn featured_speakers(State(state): State<AppState>) -> Json<Vec<FeaturedSpeaker>> {
    Json(featured_speakers::list_featured_speakers(state.cache.as_ref()))
}
