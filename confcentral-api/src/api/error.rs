//! Error responses
//!
//! Every handler error becomes a status code plus a `{"error": message}` body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use confcentral_common::Error;
use serde_json::json;

#[derive(Debug)]
pub enum ApiError {
    /// No caller identity on a route that needs one
    Unauthorized,
    /// Unparsable request parameter
    BadRequest(String),
    Domain(Error),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError::Domain(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Domain(err) => match err {
                Error::NotFound(_) => StatusCode::NOT_FOUND,
                Error::Conflict(_) => StatusCode::CONFLICT,
                Error::Forbidden(_) => StatusCode::FORBIDDEN,
                Error::InvalidFilter(_) | Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
                Error::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Unauthorized => "Authorization required".to_string(),
            ApiError::BadRequest(msg) => msg,
            ApiError::Domain(err) => {
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!(error = %err, "Request failed");
                    "Internal server error".to_string()
                } else {
                    match err {
                        Error::NotFound(msg)
                        | Error::Conflict(msg)
                        | Error::Forbidden(msg)
                        | Error::InvalidFilter(msg)
                        | Error::InvalidInput(msg)
                        | Error::Transient(msg) => msg,
                        other => other.to_string(),
                    }
                }
            }
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
