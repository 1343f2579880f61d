//! Handlers for attendance modules.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/modules/{id}` | Public; 404 if not found |
//! | `POST` | `/admin/modules` | Body: `{"identifier":"…","refresh_interval_secs":900}` |
//! | `POST` | `/admin/modules/{id}/refresh` | Stamps the last-refresh time |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use tally_core::{directory::NewModule, service::ModuleView, store::AttendanceStore};

use crate::{AppState, auth::Admin, error::ApiError};

/// `GET /modules/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
) -> Result<Json<ModuleView>, ApiError>
where
  S: AttendanceStore + 'static,
{
  Ok(Json(state.service.module(id).await?))
}

/// `POST /admin/modules`
pub async fn create<S>(
  _: Admin,
  State(state): State<AppState<S>>,
  Json(body): Json<NewModule>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AttendanceStore + 'static,
{
  let module = state
    .service
    .store()
    .add_module(body)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(module)))
}

/// `POST /admin/modules/{id}/refresh`
pub async fn refresh<S>(
  _: Admin,
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
) -> Result<Json<ModuleView>, ApiError>
where
  S: AttendanceStore + 'static,
{
  Ok(Json(state.service.refresh_module(id, Utc::now()).await?))
}
