//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use tally_core::store::{StoreError, StoreErrorKind};
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Attendance(#[from] tally_core::Error),

  #[error("unauthorized")]
  Unauthorized,

  #[error("not found: {0}")]
  NotFound(String),

  #[error("store error: {source}")]
  Store {
    kind:   StoreErrorKind,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
}

impl ApiError {
  pub fn store<E: StoreError>(e: E) -> Self {
    ApiError::Store { kind: e.kind(), source: Box::new(e) }
  }

  fn status_and_code(&self) -> (StatusCode, &'static str) {
    use tally_core::Error as E;
    match self {
      ApiError::Attendance(e) => {
        let status = match e {
          E::UnknownUser(_) | E::ModuleNotFound(_) => StatusCode::NOT_FOUND,
          E::InvalidCredentials(_) => StatusCode::UNAUTHORIZED,
          E::NotEnrolled => StatusCode::FORBIDDEN,
          E::NoMatchingBeacon => StatusCode::UNPROCESSABLE_ENTITY,
          E::InvalidInterval { .. }
          | E::PasswordHash(_)
          | E::Serialization(_)
          | E::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, e.code())
      }
      ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
      ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
      ApiError::Store { kind, .. } => match kind {
        StoreErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        StoreErrorKind::Conflict => (StatusCode::CONFLICT, "CONFLICT"),
        StoreErrorKind::Invalid => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
        StoreErrorKind::Backend => (StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE"),
      },
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, code) = self.status_and_code();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }

    let mut res =
      (status, Json(json!({ "error": self.to_string(), "code": code }))).into_response();
    if matches!(self, ApiError::Unauthorized) {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"tally-admin\""),
      );
    }
    res
  }
}
