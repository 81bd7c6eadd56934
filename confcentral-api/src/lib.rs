//! confcentral-api library - conference registration service
//!
//! Seat registration, conference queries, wishlists and cached announcement /
//! featured-speaker views over a SQLite store, exposed as a JSON HTTP API.

use std::sync::Arc;

use axum::Router;
use confcentral_common::config::{CacheSettings, RetrySettings};
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod cache;
pub mod services;

use cache::ViewCache;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Derived-view cache (announcement, featured speakers)
    pub cache: Arc<dyn ViewCache>,
    /// Contention retry bounds for transactional writes
    pub registration: RetrySettings,
    pub cache_settings: CacheSettings,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        cache: Arc<dyn ViewCache>,
        registration: RetrySettings,
        cache_settings: CacheSettings,
    ) -> Self {
        Self {
            db,
            cache,
            registration,
            cache_settings,
        }
    }
}

/// Build application router
///
/// Health, announcement and featured-speaker reads are public; every other
/// route requires an `X-User-Id` header.
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let user_routes = Router::new()
        .route("/profile", get(api::conferences::get_profile))
        .route("/conference", post(api::conferences::create_conference))
        .route(
            "/conference/:id",
            get(api::conferences::get_conference).put(api::conferences::update_conference),
        )
        .route(
            "/conference/:id/registration",
            post(api::conferences::register).delete(api::conferences::unregister),
        )
        .route(
            "/conference/:id/sessions",
            post(api::sessions::create_session).get(api::sessions::conference_sessions),
        )
        .route("/conferences/created", get(api::conferences::conferences_created))
        .route("/conferences/attending", get(api::conferences::conferences_attending))
        .route("/conferences/query", post(api::conferences::query_conferences))
        .route("/session/:id", get(api::sessions::get_session))
        .route("/sessions/by-speaker", get(api::sessions::sessions_by_speaker))
        .route(
            "/sessions/not-of-type-before",
            get(api::sessions::sessions_not_of_type_before),
        )
        .route("/wishlist", get(api::wishlist::list_wishlist))
        .route("/wishlist/:session_id", post(api::wishlist::add_to_wishlist));

    let public = Router::new()
        .route("/announcement", get(api::views::get_announcement))
        .route("/tasks/announcement", post(api::views::recompute_announcement))
        .route("/featured-speakers", get(api::views::featured_speakers))
        .merge(api::health_routes());

    Router::new()
        .merge(user_routes)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
