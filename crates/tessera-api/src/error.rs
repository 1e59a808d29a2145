//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use tessera_core::{chat::GatewayError, store::StoreError};
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("unauthorized")]
  Unauthorized,

  #[error("not found: {0}")]
  NotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("upstream error: {0}")]
  Upstream(String),

  #[error("not configured: {0}")]
  Unavailable(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Classify a backend error: missing rows become 404, uniqueness
  /// violations 409, anything else 500.
  pub fn store<E: StoreError>(e: E) -> Self {
    if e.is_not_found() {
      ApiError::NotFound(e.to_string())
    } else if e.is_conflict() {
      ApiError::Conflict(e.to_string())
    } else {
      ApiError::Store(Box::new(e))
    }
  }

  pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
    ApiError::NotFound(format!("{entity} {id} not found"))
  }

  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Conflict(_) => StatusCode::CONFLICT,
      ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
      ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
      ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<GatewayError> for ApiError {
  fn from(e: GatewayError) -> Self {
    match e {
      GatewayError::NotConfigured => ApiError::Unavailable(e.to_string()),
      other => ApiError::Upstream(other.to_string()),
    }
  }
}

impl From<tessera_core::Error> for ApiError {
  fn from(e: tessera_core::Error) -> Self { ApiError::BadRequest(e.to_string()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let message = match &self {
      ApiError::BadRequest(m)
      | ApiError::NotFound(m)
      | ApiError::Conflict(m)
      | ApiError::Upstream(m)
      | ApiError::Unavailable(m) => m.clone(),
      ApiError::Unauthorized => "unauthorized".to_owned(),
      ApiError::Store(e) => e.to_string(),
    };
    if status.is_server_error() {
      tracing::error!(%status, error = %message, "request failed");
    } else {
      tracing::debug!(%status, error = %message, "request rejected");
    }
    (status, Json(json!({ "error": message }))).into_response()
  }
}
