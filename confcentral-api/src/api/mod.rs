//! HTTP API handlers for confcentral-api

pub mod conferences;
pub mod error;
pub mod health;
pub mod identity;
pub mod sessions;
pub mod views;
pub mod wishlist;

pub use error::ApiError;
pub use health::health_routes;
pub use identity::UserId;

use serde::Serialize;

/// `{"data": ...}` envelope for scalar results
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}
