//! The attendance service: turns a beacon report into daily-log commits.
//!
//! A report moves through the [`Stage`]s in order. Any failure before
//! [`Stage::Committing`] aborts the whole report with a typed [`Error`]; once
//! committing starts, each matched module commits independently and failures
//! are collected next to the successes.

use std::{collections::HashSet, sync::Arc};

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{Instrument as _, debug, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  directory::{AttendanceModule, User},
  ledger::{DailyLog, Session},
  matcher::{Enrollment, match_beacons},
  password::verify_password,
  store::{AttendanceStore, LogQuery, SessionCommit},
  window::{compute_window, interval_from_secs},
};

// ─── Request / response types ────────────────────────────────────────────────

/// The states a report passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
  Authenticating,
  ResolvingMemberships,
  Matching,
  Windowing,
  Committing,
  Done,
}

/// A client's presence report.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportRequest {
  pub username:             String,
  pub password:             String,
  /// Network identifiers the device currently sees.
  #[serde(default)]
  pub observed_identifiers: Vec<String>,
}

/// A matched module whose window could not be computed or committed.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleFailure {
  pub module_id: i64,
  pub code:      &'static str,
  pub error:     String,
}

impl ModuleFailure {
  fn new(module_id: i64, error: &Error) -> Self {
    Self { module_id, code: error.code(), error: error.to_string() }
  }
}

/// What a report changed.
#[derive(Debug, Clone, Serialize)]
pub struct ReportOutcome {
  /// Logs touched by at least one successful commit, without duplicates.
  pub affected_log_ids: Vec<Uuid>,
  /// Matched modules that failed; the others still committed.
  pub failures:         Vec<ModuleFailure>,
}

/// Read model for the module lookup query, rendered in the service timezone.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleView {
  pub module_id:         i64,
  pub identifier:        String,
  pub last_refresh_time: DateTime<FixedOffset>,
  /// `HH:MM:SS:ffffff`
  pub last_refresh:      String,
}

// ─── Service ─────────────────────────────────────────────────────────────────

/// Orchestrates reports and attendance reads over an [`AttendanceStore`].
///
/// Cloning is cheap; the store is reference-counted.
pub struct AttendanceService<S> {
  store:    Arc<S>,
  timezone: FixedOffset,
}

impl<S> Clone for AttendanceService<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), timezone: self.timezone }
  }
}

impl<S: AttendanceStore> AttendanceService<S> {
  /// `timezone` decides both the calendar date a sighting is filed under and
  /// the minute-of-hour its window is aligned to.
  pub fn new(store: Arc<S>, timezone: FixedOffset) -> Self {
    Self { store, timezone }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  /// Process one presence report observed at `now`.
  pub async fn report(
    &self,
    request: &ReportRequest,
    now: DateTime<Utc>,
  ) -> Result<ReportOutcome> {
    let span = tracing::info_span!("report", username = %request.username);
    self.run_report(request, now).instrument(span).await
  }

  async fn run_report(
    &self,
    request: &ReportRequest,
    now: DateTime<Utc>,
  ) -> Result<ReportOutcome> {
    debug!(stage = %Stage::Authenticating);
    let user = self.authenticate(&request.username, &request.password).await?;

    debug!(stage = %Stage::ResolvingMemberships);
    let enrollments = self.enrollments_of(&user).await?;

    debug!(stage = %Stage::Matching, enrolled = enrollments.len());
    let observed: HashSet<String> =
      request.observed_identifiers.iter().cloned().collect();
    let mut seen_modules = HashSet::new();
    let matched: Vec<&AttendanceModule> = match_beacons(&observed, &enrollments)?
      .into_iter()
      .map(|e| &e.module)
      // Two groups may share a module; one commit covers both.
      .filter(|m| seen_modules.insert(m.module_id))
      .collect();

    debug!(stage = %Stage::Windowing, matched = matched.len());
    let local_now = now.with_timezone(&self.timezone);
    let date = local_now.date_naive();
    let mut failures = Vec::new();
    let mut first_error = None;
    let mut windows: Vec<(&AttendanceModule, Session)> = Vec::new();
    for module in matched {
      match interval_from_secs(module.refresh_interval_secs)
        .and_then(|interval| compute_window(&local_now, interval))
      {
        Ok(window) => windows.push((module, window)),
        Err(e) => {
          warn!(module_id = module.module_id, error = %e, "cannot window module");
          failures.push(ModuleFailure::new(module.module_id, &e));
          first_error.get_or_insert(e);
        }
      }
    }

    debug!(stage = %Stage::Committing, %date);
    let mut affected_log_ids = Vec::new();
    for (module, window) in windows {
      let commit = SessionCommit {
        user_id: user.user_id,
        date,
        module: module.clone(),
        window,
        now,
      };
      match self.store.commit_session(commit).await {
        Ok(receipt) => {
          debug!(module_id = module.module_id, log_id = %receipt.log_id, kind = ?receipt.kind);
          if !affected_log_ids.contains(&receipt.log_id) {
            affected_log_ids.push(receipt.log_id);
          }
        }
        Err(e) => {
          let e = Error::persistence(e);
          warn!(module_id = module.module_id, error = %e, "commit failed");
          failures.push(ModuleFailure::new(module.module_id, &e));
          first_error.get_or_insert(e);
        }
      }
    }

    // Partial success is reported; total failure is an error.
    if affected_log_ids.is_empty()
      && let Some(e) = first_error
    {
      return Err(e);
    }

    info!(
      stage = %Stage::Done,
      logs = affected_log_ids.len(),
      failures = failures.len(),
      "attendance recorded"
    );
    Ok(ReportOutcome { affected_log_ids, failures })
  }

  /// Resolve `username` and check `password` against the stored hash.
  pub async fn authenticate(&self, username: &str, password: &str) -> Result<User> {
    let user = self
      .store
      .find_user(username)
      .await
      .map_err(Error::persistence)?
      .ok_or_else(|| Error::UnknownUser(username.to_owned()))?;

    if !verify_password(password, &user.password_hash) {
      return Err(Error::InvalidCredentials(username.to_owned()));
    }
    Ok(user)
  }

  /// The user's attendance-enabled memberships paired with their modules.
  async fn enrollments_of(&self, user: &User) -> Result<Vec<Enrollment>> {
    let memberships = self
      .store
      .memberships_of(user.user_id)
      .await
      .map_err(Error::persistence)?;

    let mut enrollments = Vec::new();
    for membership in memberships {
      let Some(module_id) = membership.attendance_module_id() else {
        continue;
      };
      match self.store.get_module(module_id).await.map_err(Error::persistence)? {
        Some(module) => enrollments.push(Enrollment { membership, module }),
        None => warn!(
          group = %membership.group_name,
          module_id,
          "group references a missing attendance module"
        ),
      }
    }

    if enrollments.is_empty() {
      return Err(Error::NotEnrolled);
    }
    Ok(enrollments)
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  /// The module lookup query.
  pub async fn module(&self, module_id: i64) -> Result<ModuleView> {
    let module = self
      .store
      .get_module(module_id)
      .await
      .map_err(Error::persistence)?
      .ok_or(Error::ModuleNotFound(module_id))?;
    Ok(self.view(module))
  }

  /// Stamp a module's last-refresh time with `now`.
  pub async fn refresh_module(
    &self,
    module_id: i64,
    now: DateTime<Utc>,
  ) -> Result<ModuleView> {
    let module = self
      .store
      .touch_module(module_id, now)
      .await
      .map_err(Error::persistence)?
      .ok_or(Error::ModuleNotFound(module_id))?;
    info!(module_id, identifier = %module.identifier, "module refreshed");
    Ok(self.view(module))
  }

  /// A user's daily logs, optionally bounded by an inclusive date range.
  pub async fn logs_for(
    &self,
    username: &str,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
  ) -> Result<Vec<DailyLog>> {
    let user = self
      .store
      .find_user(username)
      .await
      .map_err(Error::persistence)?
      .ok_or_else(|| Error::UnknownUser(username.to_owned()))?;

    let query = LogQuery { user_id: user.user_id, from, to };
    self.store.list_logs(&query).await.map_err(Error::persistence)
  }

  fn view(&self, module: AttendanceModule) -> ModuleView {
    let last_refresh_time = module.last_refresh.with_timezone(&self.timezone);
    ModuleView {
      module_id: module.module_id,
      identifier: module.identifier,
      last_refresh: last_refresh_time.format("%H:%M:%S:%6f").to_string(),
      last_refresh_time,
    }
  }
}
