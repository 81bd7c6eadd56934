//! Wishlist endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use confcentral_common::db::Session;

use super::{ApiError, UserId};
use crate::services::wishlist;
use crate::AppState;

/// POST /wishlist/:session_id
pub async fn add_to_wishlist(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<Session>>, ApiError> {
    Ok(Json(wishlist::add_to_wishlist(&state.db, &user_id, &session_id).await?))
}

/// GET /wishlist
pub async fn list_wishlist(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> Result<Json<Vec<Session>>, ApiError> {
    Ok(Json(wishlist::list_wishlist(&state.db, &user_id).await?))
}
