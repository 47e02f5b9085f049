use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::catalog::error::CatalogError;

/// Client-facing text for failures whose detail stays in the server log.
const INTERNAL_MESSAGE: &str = "internal error";

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    status: u16,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            HttpError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            HttpError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            HttpError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = ErrorBody {
            error: message,
            status: status.as_u16(),
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<CatalogError> for HttpError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::BadRequest(msg) => {
                warn!("Rejected request: {}", msg);
                HttpError::BadRequest(msg)
            }
            CatalogError::NotFound(msg) => HttpError::NotFound(msg),
            other => {
                error!("Catalog operation failed: {}", other);
                HttpError::Internal(INTERNAL_MESSAGE.to_string())
            }
        }
    }
}

impl From<tokio::task::JoinError> for HttpError {
    fn from(err: tokio::task::JoinError) -> Self {
        error!("Catalog worker failed: {}", err);
        HttpError::Internal(INTERNAL_MESSAGE.to_string())
    }
}

impl From<axum::extract::multipart::MultipartError> for HttpError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        HttpError::BadRequest(err.body_text())
    }
}
