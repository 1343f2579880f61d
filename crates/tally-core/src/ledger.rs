//! Daily attendance logs and the rules for folding a sighting into one.
//!
//! A [`DailyLog`] is keyed by `(user, date)` and accumulates one [`Session`]
//! per distinct window in which the user was seen. Storage backends load the
//! log for the key, call [`DailyLog::record`], and write the result back
//! inside a single transaction.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::directory::AttendanceModule;

// ─── Session ─────────────────────────────────────────────────────────────────

/// One observed interval window. Two sessions are the same iff both
/// boundaries are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Session {
  pub start: DateTime<Utc>,
  pub end:   DateTime<Utc>,
}

// ─── DailyLog ────────────────────────────────────────────────────────────────

/// A user's attendance for one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyLog {
  pub log_id:        Uuid,
  pub user_id:       Uuid,
  pub date:          NaiveDate,
  /// Detection order. Never empty, and never holds the same window twice.
  pub sessions:      Vec<Session>,
  /// Credited time: one refresh interval per appended session.
  pub duration_secs: i64,
  /// Modules that contributed at least one session.
  pub modules:       BTreeSet<i64>,
  pub last_seen:     DateTime<Utc>,
}

/// What a commit did to the log for its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitKind {
  /// No log existed for `(user, date)`; one was opened.
  Created,
  /// A new session was appended and its interval credited.
  Appended,
  /// The window was already recorded; only `last_seen` moved.
  Refreshed,
}

/// The result of committing one sighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReceipt {
  pub log_id: Uuid,
  pub kind:   CommitKind,
}

impl DailyLog {
  /// Open a log for the first sighting of the day.
  pub fn open(
    user_id: Uuid,
    date: NaiveDate,
    module: &AttendanceModule,
    window: Session,
    now: DateTime<Utc>,
  ) -> Self {
    Self {
      log_id: Uuid::new_v4(),
      user_id,
      date,
      sessions: vec![window],
      duration_secs: module.refresh_interval_secs,
      modules: BTreeSet::from([module.module_id]),
      last_seen: now,
    }
  }

  /// Fold a sighting of `module` in `window` into this log.
  ///
  /// A window already in `sessions` only refreshes `last_seen`. One report
  /// can commit several modules into the same log, so their windows
  /// interleave and the trailing session alone cannot detect a repeat.
  /// Anything else is appended, credited with the module's refresh interval,
  /// and the module is added to the contributor set.
  pub fn record(
    &mut self,
    module: &AttendanceModule,
    window: Session,
    now: DateTime<Utc>,
  ) -> CommitKind {
    self.last_seen = now;

    if self.sessions.contains(&window) {
      return CommitKind::Refreshed;
    }

    self.sessions.push(window);
    self.duration_secs += module.refresh_interval_secs;
    self.modules.insert(module.module_id);
    CommitKind::Appended
  }

  pub fn duration(&self) -> TimeDelta { TimeDelta::seconds(self.duration_secs) }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn module(module_id: i64, minutes: i64) -> AttendanceModule {
    AttendanceModule {
      module_id,
      identifier: format!("AP-{module_id}"),
      refresh_interval_secs: minutes * 60,
      last_refresh: Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap(),
    }
  }

  fn window(h: u32, m: u32, minutes: i64) -> Session {
    let start = Utc.with_ymd_and_hms(2024, 3, 11, h, m, 0).unwrap();
    Session { start, end: start + TimeDelta::minutes(minutes) }
  }

  fn time(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 11, h, m, 0).unwrap()
  }

  fn opened() -> DailyLog {
    DailyLog::open(
      Uuid::new_v4(),
      NaiveDate::from_ymd_opt(2024, 3, 11).unwrap(),
      &module(1, 15),
      window(10, 0, 15),
      time(10, 7),
    )
  }

  #[test]
  fn open_credits_one_interval() {
    let log = opened();
    assert_eq!(log.sessions, vec![window(10, 0, 15)]);
    assert_eq!(log.duration(), TimeDelta::minutes(15));
    assert_eq!(log.modules, BTreeSet::from([1]));
    assert_eq!(log.last_seen, time(10, 7));
  }

  #[test]
  fn repeated_window_only_refreshes_last_seen() {
    let mut log = opened();
    let kind = log.record(&module(1, 15), window(10, 0, 15), time(10, 12));

    assert_eq!(kind, CommitKind::Refreshed);
    assert_eq!(log.sessions.len(), 1);
    assert_eq!(log.duration(), TimeDelta::minutes(15));
    assert_eq!(log.last_seen, time(10, 12));
  }

  #[test]
  fn next_window_appends_and_credits() {
    let mut log = opened();
    let kind = log.record(&module(1, 15), window(10, 15, 15), time(10, 16));

    assert_eq!(kind, CommitKind::Appended);
    assert_eq!(log.sessions, vec![window(10, 0, 15), window(10, 15, 15)]);
    assert_eq!(log.duration(), TimeDelta::minutes(30));
    assert_eq!(log.modules, BTreeSet::from([1]));
  }

  #[test]
  fn second_module_joins_the_contributor_set() {
    let mut log = opened();
    log.record(&module(2, 30), window(10, 0, 30), time(10, 8));

    assert_eq!(log.modules, BTreeSet::from([1, 2]));
    assert_eq!(log.duration(), TimeDelta::minutes(45));
  }

  #[test]
  fn refresh_does_not_touch_modules() {
    let mut log = opened();
    // Same boundaries as the trailing session, but reported via module 2.
    log.record(&module(2, 15), window(10, 0, 15), time(10, 9));
    assert_eq!(log.modules, BTreeSet::from([1]));
  }

  #[test]
  fn interleaved_modules_are_credited_once_per_window() {
    let mut log = opened();
    let lab = module(1, 15);
    let club = module(2, 30);
    log.record(&club, window(10, 0, 30), time(10, 7));

    for at in [8, 9, 10] {
      assert_eq!(log.record(&lab, window(10, 0, 15), time(10, at)), CommitKind::Refreshed);
      assert_eq!(log.record(&club, window(10, 0, 30), time(10, at)), CommitKind::Refreshed);
    }

    assert_eq!(log.sessions, vec![window(10, 0, 15), window(10, 0, 30)]);
    assert_eq!(log.duration(), TimeDelta::minutes(45));
    assert_eq!(log.last_seen, time(10, 10));
  }

  #[test]
  fn late_ping_for_an_earlier_window_is_not_recredited() {
    let mut log = opened();
    log.record(&module(1, 15), window(10, 15, 15), time(10, 16));
    let kind = log.record(&module(1, 15), window(10, 0, 15), time(10, 17));

    assert_eq!(kind, CommitKind::Refreshed);
    assert_eq!(log.sessions.len(), 2);
    assert_eq!(log.duration(), TimeDelta::minutes(30));
  }

  #[test]
  fn duration_never_decreases() {
    let mut log = opened();
    let mut previous = log.duration_secs;
    for (h, m, at) in [(10, 0, 10), (10, 15, 16), (10, 15, 20), (10, 30, 31), (10, 30, 44)] {
      log.record(&module(1, 15), window(h, m, 15), time(10, at));
      assert!(log.duration_secs >= previous);
      previous = log.duration_secs;
    }
    assert_eq!(log.duration(), TimeDelta::minutes(45));
  }
}
