//! Error types for `tally-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("user does not exist: {0:?}")]
  UnknownUser(String),

  #[error("wrong password for user {0:?}")]
  InvalidCredentials(String),

  #[error("user is not a member of any group with attendance enabled")]
  NotEnrolled,

  #[error("no reported identifier matches an enrolled attendance module")]
  NoMatchingBeacon,

  #[error("refresh interval of {seconds}s is not a positive whole number of minutes")]
  InvalidInterval { seconds: i64 },

  #[error("attendance module not found: {0}")]
  ModuleNotFound(i64),

  #[error("password hashing error: {0}")]
  PasswordHash(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("persistence error: {0}")]
  Persistence(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Box a storage backend error into [`Error::Persistence`].
  pub fn persistence<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Persistence(Box::new(err))
  }

  /// Stable machine-readable code for the error kind.
  pub fn code(&self) -> &'static str {
    match self {
      Self::UnknownUser(_) => "UNKNOWN_USER",
      Self::InvalidCredentials(_) => "INVALID_CREDENTIALS",
      Self::NotEnrolled => "NOT_ENROLLED",
      Self::NoMatchingBeacon => "NO_MATCHING_BEACON",
      Self::InvalidInterval { .. } => "INVALID_INTERVAL",
      Self::ModuleNotFound(_) => "MODULE_NOT_FOUND",
      Self::PasswordHash(_) => "PASSWORD_HASH",
      Self::Serialization(_) => "SERIALIZATION",
      Self::Persistence(_) => "PERSISTENCE",
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
