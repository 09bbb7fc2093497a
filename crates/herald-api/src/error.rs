//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error(transparent)]
  Engine(#[from] herald_engine::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      // Validation and empty-audience outcomes are the caller's to fix;
      // upstream and persistence faults are ours.
      ApiError::Engine(e) => match e {
        herald_engine::Error::InvalidInput(_) | herald_engine::Error::NoRecipients => {
          (StatusCode::BAD_REQUEST, e.to_string())
        }
        herald_engine::Error::Upstream(_) | herald_engine::Error::Persistence(_) => {
          (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
      },
      ApiError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
