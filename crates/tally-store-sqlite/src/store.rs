//! [`SqliteStore`]: the SQLite implementation of [`AttendanceStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use tally_core::{
  directory::{AttendanceModule, Group, GroupMembership, NewGroup, NewModule, User},
  ledger::{CommitKind, CommitReceipt, DailyLog},
  store::{AttendanceStore, LogQuery, SessionCommit},
  window::interval_from_secs,
};

use crate::{
  encode::{
    DAILY_LOG_COLUMNS, RawDailyLog, RawMembership, RawModule, RawUser, encode_date,
    encode_dt, encode_sessions, encode_uuid,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Tally attendance store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

/// Read one log and its contributing modules for `(user_id, log_date)`.
fn find_log_for_day(
  conn: &rusqlite::Connection,
  user_id: &str,
  log_date: &str,
) -> rusqlite::Result<Option<RawDailyLog>> {
  let raw = conn
    .query_row(
      &format!(
        "SELECT {DAILY_LOG_COLUMNS} FROM daily_logs
         WHERE user_id = ?1 AND log_date = ?2"
      ),
      rusqlite::params![user_id, log_date],
      RawDailyLog::from_row,
    )
    .optional()?;

  match raw {
    Some(mut raw) => {
      raw.load_modules(conn)?;
      Ok(Some(raw))
    }
    None => Ok(None),
  }
}

// ─── AttendanceStore impl ────────────────────────────────────────────────────

impl AttendanceStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn add_user(&self, username: String, password_hash: String) -> Result<User> {
    let user = User {
      user_id: Uuid::new_v4(),
      username,
      password_hash,
      created_at: Utc::now(),
    };

    let id_str   = encode_uuid(user.user_id);
    let name     = user.username.clone();
    let hash     = user.password_hash.clone();
    let at_str   = encode_dt(user.created_at);

    let inserted: bool = self
      .conn
      .call(move |conn| {
        let taken = conn
          .query_row(
            "SELECT 1 FROM users WHERE username = ?1",
            rusqlite::params![name],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if taken {
          return Ok(false);
        }

        conn.execute(
          "INSERT INTO users (user_id, username, password_hash, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, name, hash, at_str],
        )?;
        Ok(true)
      })
      .await?;

    if !inserted {
      return Err(Error::UsernameTaken(user.username));
    }
    Ok(user)
  }

  async fn find_user(&self, username: &str) -> Result<Option<User>> {
    let name = username.to_owned();

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT user_id, username, password_hash, created_at
             FROM users WHERE username = ?1",
            rusqlite::params![name],
            RawUser::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  // ── Modules ───────────────────────────────────────────────────────────────

  async fn add_module(&self, input: NewModule) -> Result<AttendanceModule> {
    interval_from_secs(input.refresh_interval_secs)?;

    let last_refresh = Utc::now();
    let identifier   = input.identifier.clone();
    let secs         = input.refresh_interval_secs;
    let at_str       = encode_dt(last_refresh);

    let module_id: Option<i64> = self
      .conn
      .call(move |conn| {
        let taken = conn
          .query_row(
            "SELECT 1 FROM modules WHERE identifier = ?1",
            rusqlite::params![identifier],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if taken {
          return Ok(None);
        }

        conn.execute(
          "INSERT INTO modules (identifier, refresh_interval_secs, last_refresh)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![identifier, secs, at_str],
        )?;
        Ok(Some(conn.last_insert_rowid()))
      })
      .await?;

    let module_id =
      module_id.ok_or_else(|| Error::IdentifierTaken(input.identifier.clone()))?;

    Ok(AttendanceModule {
      module_id,
      identifier: input.identifier,
      refresh_interval_secs: input.refresh_interval_secs,
      last_refresh,
    })
  }

  async fn get_module(&self, module_id: i64) -> Result<Option<AttendanceModule>> {
    let raw: Option<RawModule> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT module_id, identifier, refresh_interval_secs, last_refresh
             FROM modules WHERE module_id = ?1",
            rusqlite::params![module_id],
            RawModule::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawModule::into_module).transpose()
  }

  async fn touch_module(
    &self,
    module_id: i64,
    at:        DateTime<Utc>,
  ) -> Result<Option<AttendanceModule>> {
    let at_str = encode_dt(at);

    let raw: Option<RawModule> = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE modules SET last_refresh = ?2 WHERE module_id = ?1",
          rusqlite::params![module_id, at_str],
        )?;
        if changed == 0 {
          return Ok(None);
        }

        Ok(Some(conn.query_row(
          "SELECT module_id, identifier, refresh_interval_secs, last_refresh
           FROM modules WHERE module_id = ?1",
          rusqlite::params![module_id],
          RawModule::from_row,
        )?))
      })
      .await?;

    raw.map(RawModule::into_module).transpose()
  }

  // ── Groups ────────────────────────────────────────────────────────────────

  async fn add_group(&self, input: NewGroup) -> Result<Group> {
    if input.attendance_enabled && input.module_id.is_none() {
      return Err(Error::AttendanceWithoutModule);
    }

    let group = Group {
      group_id:           Uuid::new_v4(),
      name:               input.name,
      attendance_enabled: input.attendance_enabled,
      module_id:          input.module_id,
      created_at:         Utc::now(),
    };

    let id_str    = encode_uuid(group.group_id);
    let name      = group.name.clone();
    let enabled   = group.attendance_enabled;
    let module_id = group.module_id;
    let at_str    = encode_dt(group.created_at);

    // `Some(id)` when the referenced module does not exist.
    let missing_module: Option<i64> = self
      .conn
      .call(move |conn| {
        if let Some(id) = module_id {
          let exists = conn
            .query_row(
              "SELECT 1 FROM modules WHERE module_id = ?1",
              rusqlite::params![id],
              |_| Ok(()),
            )
            .optional()?
            .is_some();
          if !exists {
            return Ok(Some(id));
          }
        }

        conn.execute(
          "INSERT INTO member_groups (group_id, name, attendance_enabled, module_id, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, name, enabled, module_id, at_str],
        )?;
        Ok(None)
      })
      .await?;

    if let Some(id) = missing_module {
      return Err(Error::ModuleNotFound(id));
    }
    Ok(group)
  }

  async fn add_member(&self, group_id: Uuid, user_id: Uuid) -> Result<()> {
    let group_str = encode_uuid(group_id);
    let user_str  = encode_uuid(user_id);

    let (group_exists, user_exists): (bool, bool) = self
      .conn
      .call(move |conn| {
        let group_exists = conn
          .query_row(
            "SELECT 1 FROM member_groups WHERE group_id = ?1",
            rusqlite::params![group_str],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        let user_exists = conn
          .query_row(
            "SELECT 1 FROM users WHERE user_id = ?1",
            rusqlite::params![user_str],
            |_| Ok(()),
          )
          .optional()?
          .is_some();

        if group_exists && user_exists {
          conn.execute(
            "INSERT OR IGNORE INTO group_members (group_id, user_id) VALUES (?1, ?2)",
            rusqlite::params![group_str, user_str],
          )?;
        }
        Ok((group_exists, user_exists))
      })
      .await?;

    if !group_exists {
      return Err(Error::GroupNotFound(group_id));
    }
    if !user_exists {
      return Err(Error::UserNotFound(user_id));
    }
    Ok(())
  }

  async fn memberships_of(&self, user_id: Uuid) -> Result<Vec<GroupMembership>> {
    let user_str = encode_uuid(user_id);

    let raws: Vec<RawMembership> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT g.group_id, g.name, g.attendance_enabled, g.module_id
           FROM member_groups g
           JOIN group_members m ON m.group_id = g.group_id
           WHERE m.user_id = ?1
           ORDER BY g.created_at",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![user_str], RawMembership::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMembership::into_membership).collect()
  }

  // ── Ledger ────────────────────────────────────────────────────────────────

  async fn commit_session(&self, commit: SessionCommit) -> Result<CommitReceipt> {
    let user_str = encode_uuid(commit.user_id);
    let date_str = encode_date(commit.date);

    let receipt = self
      .conn
      .call(move |conn| {
        // IMMEDIATE takes the write lock before the read, so no other writer
        // can slip in between lookup and update for this key.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing = find_log_for_day(&tx, &user_str, &date_str)?
          .map(RawDailyLog::into_log)
          .transpose()
          .map_err(Error::into_call)?;

        let (log, kind) = match existing {
          None => {
            let log = DailyLog::open(
              commit.user_id,
              commit.date,
              &commit.module,
              commit.window,
              commit.now,
            );
            (log, CommitKind::Created)
          }
          Some(mut log) => {
            let kind = log.record(&commit.module, commit.window, commit.now);
            (log, kind)
          }
        };

        let log_str       = encode_uuid(log.log_id);
        let last_seen_str = encode_dt(log.last_seen);

        match kind {
          CommitKind::Created => {
            let sessions_str =
              encode_sessions(&log.sessions).map_err(Error::into_call)?;
            tx.execute(
              "INSERT INTO daily_logs
                 (log_id, user_id, log_date, sessions, duration_secs, last_seen)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
              rusqlite::params![
                log_str,
                user_str,
                date_str,
                sessions_str,
                log.duration_secs,
                last_seen_str,
              ],
            )?;
          }
          CommitKind::Appended => {
            let sessions_str =
              encode_sessions(&log.sessions).map_err(Error::into_call)?;
            tx.execute(
              "UPDATE daily_logs
               SET sessions = ?2, duration_secs = ?3, last_seen = ?4
               WHERE log_id = ?1",
              rusqlite::params![log_str, sessions_str, log.duration_secs, last_seen_str],
            )?;
          }
          CommitKind::Refreshed => {
            tx.execute(
              "UPDATE daily_logs SET last_seen = ?2 WHERE log_id = ?1",
              rusqlite::params![log_str, last_seen_str],
            )?;
          }
        }

        if kind != CommitKind::Refreshed {
          tx.execute(
            "INSERT OR IGNORE INTO log_modules (log_id, module_id) VALUES (?1, ?2)",
            rusqlite::params![log_str, commit.module.module_id],
          )?;
        }

        tx.commit()?;
        Ok(CommitReceipt { log_id: log.log_id, kind })
      })
      .await?;

    Ok(receipt)
  }

  async fn get_log(&self, log_id: Uuid) -> Result<Option<DailyLog>> {
    let log_str = encode_uuid(log_id);

    let raw: Option<RawDailyLog> = self
      .conn
      .call(move |conn| {
        let raw = conn
          .query_row(
            &format!("SELECT {DAILY_LOG_COLUMNS} FROM daily_logs WHERE log_id = ?1"),
            rusqlite::params![log_str],
            RawDailyLog::from_row,
          )
          .optional()?;
        match raw {
          Some(mut raw) => {
            raw.load_modules(conn)?;
            Ok(Some(raw))
          }
          None => Ok(None),
        }
      })
      .await?;

    raw.map(RawDailyLog::into_log).transpose()
  }

  async fn list_logs(&self, query: &LogQuery) -> Result<Vec<DailyLog>> {
    let user_str = encode_uuid(query.user_id);
    let from_str = query.from.map(encode_date);
    let to_str   = query.to.map(encode_date);

    let raws: Vec<RawDailyLog> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {DAILY_LOG_COLUMNS} FROM daily_logs
           WHERE user_id = ?1
             AND (?2 IS NULL OR log_date >= ?2)
             AND (?3 IS NULL OR log_date <= ?3)
           ORDER BY log_date"
        ))?;
        let mut rows = stmt
          .query_map(
            rusqlite::params![user_str, from_str, to_str],
            RawDailyLog::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        for raw in &mut rows {
          raw.load_modules(conn)?;
        }
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDailyLog::into_log).collect()
  }
}
