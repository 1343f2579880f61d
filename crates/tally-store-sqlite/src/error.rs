//! Error type for `tally-store-sqlite`.

use tally_core::store::{StoreError, StoreErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] tally_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("username already taken: {0:?}")]
  UsernameTaken(String),

  #[error("module identifier already taken: {0:?}")]
  IdentifierTaken(String),

  #[error("attendance cannot be enabled without a module")]
  AttendanceWithoutModule,

  #[error("user not found: {0}")]
  UserNotFound(uuid::Uuid),

  #[error("group not found: {0}")]
  GroupNotFound(uuid::Uuid),

  #[error("module not found: {0}")]
  ModuleNotFound(i64),
}

impl StoreError for Error {
  fn kind(&self) -> StoreErrorKind {
    match self {
      Error::UserNotFound(_) | Error::GroupNotFound(_) | Error::ModuleNotFound(_) => {
        StoreErrorKind::NotFound
      }
      Error::UsernameTaken(_) | Error::IdentifierTaken(_) => StoreErrorKind::Conflict,
      Error::AttendanceWithoutModule
      | Error::Core(tally_core::Error::InvalidInterval { .. }) => StoreErrorKind::Invalid,
      _ => StoreErrorKind::Backend,
    }
  }
}

impl Error {
  /// Box this error so it can cross a `tokio_rusqlite` call boundary.
  pub(crate) fn into_call(self) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Other(Box::new(self))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
