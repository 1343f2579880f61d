//! `POST /attendance/report`: a device reporting the beacons it sees.
//!
//! Body: `{"username":"…","password":"…","observed_identifiers":["…"]}`.
//! The observation time is the server clock at receipt.

use axum::{Json, extract::State};
use chrono::Utc;
use tally_core::{
  service::{ReportOutcome, ReportRequest},
  store::AttendanceStore,
};

use crate::{AppState, error::ApiError};

pub async fn handler<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<ReportRequest>,
) -> Result<Json<ReportOutcome>, ApiError>
where
  S: AttendanceStore + 'static,
{
  let outcome = state.service.report(&body, Utc::now()).await?;
  Ok(Json(outcome))
}
