//! Directory records: users, groups and the attendance modules they point at.
//!
//! These are owned by the surrounding membership system; the attendance core
//! only reads them. Writes exist so that a deployment can provision itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Users ───────────────────────────────────────────────────────────────────

/// A member who can report attendance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub user_id:       Uuid,
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub created_at:    DateTime<Utc>,
}

// ─── Modules ─────────────────────────────────────────────────────────────────

/// One presence source: the network identifier a device must see, and the
/// bucket width used to quantise its sightings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceModule {
  pub module_id:             i64,
  /// Expected network identifier (e.g. a Wi-Fi SSID). Unique per module.
  pub identifier:            String,
  /// Bucket width in seconds; always a positive whole number of minutes.
  pub refresh_interval_secs: i64,
  pub last_refresh:          DateTime<Utc>,
}

/// Input to [`crate::store::AttendanceStore::add_module`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewModule {
  pub identifier:            String,
  pub refresh_interval_secs: i64,
}

// ─── Groups ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
  pub group_id:           Uuid,
  pub name:               String,
  pub attendance_enabled: bool,
  /// Set whenever `attendance_enabled` is.
  pub module_id:          Option<i64>,
  pub created_at:         DateTime<Utc>,
}

/// Input to [`crate::store::AttendanceStore::add_group`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewGroup {
  pub name:               String,
  #[serde(default)]
  pub attendance_enabled: bool,
  pub module_id:          Option<i64>,
}

/// A user's membership in one group, as seen from the user's side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembership {
  pub group_id:           Uuid,
  pub group_name:         String,
  pub attendance_enabled: bool,
  pub module_id:          Option<i64>,
}

impl GroupMembership {
  /// The module this membership credits attendance to, if it credits any.
  pub fn attendance_module_id(&self) -> Option<i64> {
    self.module_id.filter(|_| self.attendance_enabled)
  }
}
