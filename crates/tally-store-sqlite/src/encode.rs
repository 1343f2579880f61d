//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, dates as `YYYY-MM-DD`, UUIDs as
//! hyphenated lowercase strings. Sessions are a compact JSON array.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use tally_core::{
  directory::{AttendanceModule, GroupMembership, User},
  ledger::{DailyLog, Session},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ────────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Sessions ─────────────────────────────────────────────────────────────────

pub fn encode_sessions(sessions: &[Session]) -> Result<String> {
  Ok(serde_json::to_string(sessions)?)
}

pub fn decode_sessions(s: &str) -> Result<Vec<Session>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub user_id:       String,
  pub username:      String,
  pub password_hash: String,
  pub created_at:    String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:       row.get(0)?,
      username:      row.get(1)?,
      password_hash: row.get(2)?,
      created_at:    row.get(3)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:       decode_uuid(&self.user_id)?,
      username:      self.username,
      password_hash: self.password_hash,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `modules` row.
pub struct RawModule {
  pub module_id:             i64,
  pub identifier:            String,
  pub refresh_interval_secs: i64,
  pub last_refresh:          String,
}

impl RawModule {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      module_id:             row.get(0)?,
      identifier:            row.get(1)?,
      refresh_interval_secs: row.get(2)?,
      last_refresh:          row.get(3)?,
    })
  }

  pub fn into_module(self) -> Result<AttendanceModule> {
    Ok(AttendanceModule {
      module_id:             self.module_id,
      identifier:            self.identifier,
      refresh_interval_secs: self.refresh_interval_secs,
      last_refresh:          decode_dt(&self.last_refresh)?,
    })
  }
}

/// Raw values read from a `member_groups` row joined against `group_members`.
pub struct RawMembership {
  pub group_id:           String,
  pub group_name:         String,
  pub attendance_enabled: bool,
  pub module_id:          Option<i64>,
}

impl RawMembership {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      group_id:           row.get(0)?,
      group_name:         row.get(1)?,
      attendance_enabled: row.get(2)?,
      module_id:          row.get(3)?,
    })
  }

  pub fn into_membership(self) -> Result<GroupMembership> {
    Ok(GroupMembership {
      group_id:           decode_uuid(&self.group_id)?,
      group_name:         self.group_name,
      attendance_enabled: self.attendance_enabled,
      module_id:          self.module_id,
    })
  }
}

/// Raw values read from a `daily_logs` row, plus its `log_modules` ids.
pub struct RawDailyLog {
  pub log_id:        String,
  pub user_id:       String,
  pub log_date:      String,
  pub sessions:      String,
  pub duration_secs: i64,
  pub last_seen:     String,
  pub modules:       Vec<i64>,
}

/// Column list matching [`RawDailyLog::from_row`].
pub const DAILY_LOG_COLUMNS: &str =
  "log_id, user_id, log_date, sessions, duration_secs, last_seen";

impl RawDailyLog {
  /// Read the `daily_logs` columns; `modules` is filled in separately.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      log_id:        row.get(0)?,
      user_id:       row.get(1)?,
      log_date:      row.get(2)?,
      sessions:      row.get(3)?,
      duration_secs: row.get(4)?,
      last_seen:     row.get(5)?,
      modules:       Vec::new(),
    })
  }

  /// Load the contributing module ids for this log.
  pub fn load_modules(&mut self, conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare_cached(
      "SELECT module_id FROM log_modules WHERE log_id = ?1 ORDER BY module_id",
    )?;
    self.modules = stmt
      .query_map(rusqlite::params![self.log_id], |r| r.get(0))?
      .collect::<rusqlite::Result<Vec<i64>>>()?;
    Ok(())
  }

  pub fn into_log(self) -> Result<DailyLog> {
    Ok(DailyLog {
      log_id:        decode_uuid(&self.log_id)?,
      user_id:       decode_uuid(&self.user_id)?,
      date:          decode_date(&self.log_date)?,
      sessions:      decode_sessions(&self.sessions)?,
      duration_secs: self.duration_secs,
      modules:       self.modules.into_iter().collect::<BTreeSet<_>>(),
      last_seen:     decode_dt(&self.last_seen)?,
    })
  }
}
