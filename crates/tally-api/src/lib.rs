//! JSON REST API for Tally.
//!
//! Exposes an axum [`Router`] over an [`AttendanceService`]. Devices report
//! on `/attendance/report` with their own credentials in the body; the
//! `/admin` routes require the operator's HTTP Basic credentials.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = tally_api::api_router(AppState::new(service, admin));
//! ```

pub mod admin;
pub mod auth;
pub mod error;
pub mod modules;
pub mod report;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use tally_core::{service::AttendanceService, store::AttendanceStore};
use tower_http::trace::TraceLayer;

pub use auth::AdminCredentials;
pub use error::ApiError;

// ─── State ────────────────────────────────────────────────────────────────────

/// Shared state passed to every handler via axum's `State` extractor.
pub struct AppState<S> {
  pub service: AttendanceService<S>,
  pub admin:   Arc<AdminCredentials>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { service: self.service.clone(), admin: Arc::clone(&self.admin) }
  }
}

impl<S> AppState<S> {
  pub fn new(service: AttendanceService<S>, admin: AdminCredentials) -> Self {
    Self { service, admin: Arc::new(admin) }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: AttendanceStore + 'static,
{
  Router::new()
    // Devices
    .route("/attendance/report", post(report::handler::<S>))
    .route("/modules/{id}", get(modules::get_one::<S>))
    // Operator
    .route("/admin/modules", post(modules::create::<S>))
    .route("/admin/modules/{id}/refresh", post(modules::refresh::<S>))
    .route("/admin/users", post(admin::create_user::<S>))
    .route("/admin/users/{username}/logs", get(admin::list_logs::<S>))
    .route("/admin/groups", post(admin::create_group::<S>))
    .route("/admin/groups/{id}/members", post(admin::add_member::<S>))
    .route("/admin/logs/{id}", get(admin::get_log::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Tests ────────────────────────────────────────────────────────────────────
