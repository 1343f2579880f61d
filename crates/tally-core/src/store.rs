//! The `AttendanceStore` trait and supporting input types.
//!
//! The trait is implemented by storage backends (e.g. `tally-store-sqlite`).
//! It covers two concerns: the directory the attendance core reads (users,
//! groups, modules) and the session ledger it writes.

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
  directory::{AttendanceModule, Group, GroupMembership, NewGroup, NewModule, User},
  ledger::{CommitReceipt, DailyLog, Session},
};

// ─── Input types ─────────────────────────────────────────────────────────────

/// One sighting to fold into the `(user_id, date)` log.
#[derive(Debug, Clone)]
pub struct SessionCommit {
  pub user_id: Uuid,
  /// Calendar date in the service's configured timezone.
  pub date:    NaiveDate,
  pub module:  AttendanceModule,
  pub window:  Session,
  pub now:     DateTime<Utc>,
}

/// Parameters for [`AttendanceStore::list_logs`].
#[derive(Debug, Clone)]
pub struct LogQuery {
  pub user_id: Uuid,
  /// Inclusive lower bound on the log date.
  pub from:    Option<NaiveDate>,
  /// Inclusive upper bound on the log date.
  pub to:      Option<NaiveDate>,
}

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Coarse classification of a backend error, so that callers can react to it
/// without knowing the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
  /// A referenced user, group or module does not exist.
  NotFound,
  /// A uniqueness rule would be broken (e.g. a taken username).
  Conflict,
  /// The input was rejected before reaching storage.
  Invalid,
  /// Anything else: I/O, corruption, decoding.
  Backend,
}

pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn kind(&self) -> StoreErrorKind;
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Tally storage backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait AttendanceStore: Send + Sync {
  type Error: StoreError;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Persist a user. `password_hash` must already be an argon2 PHC string.
  fn add_user(
    &self,
    username: String,
    password_hash: String,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Look a user up by username. Returns `None` if not found.
  fn find_user<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  // ── Modules ───────────────────────────────────────────────────────────

  fn add_module(
    &self,
    input: NewModule,
  ) -> impl Future<Output = Result<AttendanceModule, Self::Error>> + Send + '_;

  /// Retrieve a module by id. Returns `None` if not found.
  fn get_module(
    &self,
    module_id: i64,
  ) -> impl Future<Output = Result<Option<AttendanceModule>, Self::Error>>
  + Send
  + '_;

  /// Stamp a module's last-refresh time. Returns `None` if not found.
  fn touch_module(
    &self,
    module_id: i64,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<AttendanceModule>, Self::Error>>
  + Send
  + '_;

  // ── Groups ────────────────────────────────────────────────────────────

  fn add_group(
    &self,
    input: NewGroup,
  ) -> impl Future<Output = Result<Group, Self::Error>> + Send + '_;

  /// Add a user to a group. Adding an existing member is a no-op.
  fn add_member(
    &self,
    group_id: Uuid,
    user_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Every group the user belongs to, attendance-enabled or not.
  fn memberships_of(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<GroupMembership>, Self::Error>> + Send + '_;

  // ── Ledger ────────────────────────────────────────────────────────────

  /// Fold one sighting into the log for `(commit.user_id, commit.date)`,
  /// creating the log if needed.
  ///
  /// The read-modify-write must be atomic per key: concurrent commits for the
  /// same user and date must neither open two logs nor both append the same
  /// window.
  fn commit_session(
    &self,
    commit: SessionCommit,
  ) -> impl Future<Output = Result<CommitReceipt, Self::Error>> + Send + '_;

  /// Retrieve a log by id. Returns `None` if not found.
  fn get_log(
    &self,
    log_id: Uuid,
  ) -> impl Future<Output = Result<Option<DailyLog>, Self::Error>> + Send + '_;

  /// A user's logs ordered by date.
  fn list_logs<'a>(
    &'a self,
    query: &'a LogQuery,
  ) -> impl Future<Output = Result<Vec<DailyLog>, Self::Error>> + Send + 'a;
}
