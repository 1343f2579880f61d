//! Operator provisioning and log reads. Every handler requires [`Admin`].
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/admin/users` | Body: `{"username":"…","password":"…"}` |
//! | `POST` | `/admin/groups` | Body: `{"name":"…","attendance_enabled":true,"module_id":1}` |
//! | `POST` | `/admin/groups/{id}/members` | Body: `{"username":"…"}` |
//! | `GET`  | `/admin/users/{username}/logs` | Optional `?from=YYYY-MM-DD&to=YYYY-MM-DD` |
//! | `GET`  | `/admin/logs/{id}` | 404 if not found |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tally_core::{
  directory::NewGroup,
  ledger::DailyLog,
  password::hash_password,
  store::AttendanceStore,
};
use uuid::Uuid;

use crate::{AppState, auth::Admin, error::ApiError};

// ─── Users ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateUserBody {
  pub username: String,
  pub password: String,
}

/// `POST /admin/users`
pub async fn create_user<S>(
  _: Admin,
  State(state): State<AppState<S>>,
  Json(body): Json<CreateUserBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AttendanceStore + 'static,
{
  let hash = hash_password(&body.password)?;
  let user = state
    .service
    .store()
    .add_user(body.username, hash)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(user_id = %user.user_id, username = %user.username, "user created");
  Ok((StatusCode::CREATED, Json(user)))
}

// ─── Groups ───────────────────────────────────────────────────────────────────

/// `POST /admin/groups`
pub async fn create_group<S>(
  _: Admin,
  State(state): State<AppState<S>>,
  Json(body): Json<NewGroup>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AttendanceStore + 'static,
{
  let group = state
    .service
    .store()
    .add_group(body)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(group)))
}

#[derive(Debug, Deserialize)]
pub struct AddMemberBody {
  pub username: String,
}

/// `POST /admin/groups/{id}/members`
pub async fn add_member<S>(
  _: Admin,
  State(state): State<AppState<S>>,
  Path(group_id): Path<Uuid>,
  Json(body): Json<AddMemberBody>,
) -> Result<StatusCode, ApiError>
where
  S: AttendanceStore + 'static,
{
  let store = state.service.store();
  let user = store
    .find_user(&body.username)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("user {:?} not found", body.username)))?;

  store
    .add_member(group_id, user.user_id)
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Logs ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LogRange {
  pub from: Option<NaiveDate>,
  pub to:   Option<NaiveDate>,
}

/// `GET /admin/users/{username}/logs[?from=…&to=…]`
pub async fn list_logs<S>(
  _: Admin,
  State(state): State<AppState<S>>,
  Path(username): Path<String>,
  Query(range): Query<LogRange>,
) -> Result<Json<Vec<DailyLog>>, ApiError>
where
  S: AttendanceStore + 'static,
{
  let logs = state.service.logs_for(&username, range.from, range.to).await?;
  Ok(Json(logs))
}

/// `GET /admin/logs/{id}`
pub async fn get_log<S>(
  _: Admin,
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<DailyLog>, ApiError>
where
  S: AttendanceStore + 'static,
{
  let log = state
    .service
    .store()
    .get_log(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("log {id} not found")))?;
  Ok(Json(log))
}
