//! SQL schema for the Tally SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY,
    username      TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,   -- argon2 PHC string
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS modules (
    module_id             INTEGER PRIMARY KEY AUTOINCREMENT,
    identifier            TEXT NOT NULL UNIQUE,
    refresh_interval_secs INTEGER NOT NULL,
    last_refresh          TEXT NOT NULL,
    CHECK (refresh_interval_secs > 0 AND refresh_interval_secs % 60 = 0)
);

-- `groups` is an SQL keyword, hence the prefix.
CREATE TABLE IF NOT EXISTS member_groups (
    group_id           TEXT PRIMARY KEY,
    name               TEXT NOT NULL,
    attendance_enabled INTEGER NOT NULL DEFAULT 0,
    module_id          INTEGER REFERENCES modules(module_id),
    created_at         TEXT NOT NULL,
    CHECK (attendance_enabled = 0 OR module_id IS NOT NULL)
);

CREATE TABLE IF NOT EXISTS group_members (
    group_id TEXT NOT NULL REFERENCES member_groups(group_id),
    user_id  TEXT NOT NULL REFERENCES users(user_id),
    PRIMARY KEY (group_id, user_id)
);

-- One row per (user, date). Sessions are a JSON array in append order.
CREATE TABLE IF NOT EXISTS daily_logs (
    log_id        TEXT PRIMARY KEY,
    user_id       TEXT NOT NULL REFERENCES users(user_id),
    log_date      TEXT NOT NULL,   -- YYYY-MM-DD in the service timezone
    sessions      TEXT NOT NULL,
    duration_secs INTEGER NOT NULL,
    last_seen     TEXT NOT NULL,
    UNIQUE (user_id, log_date)
);

CREATE TABLE IF NOT EXISTS log_modules (
    log_id    TEXT NOT NULL REFERENCES daily_logs(log_id),
    module_id INTEGER NOT NULL REFERENCES modules(module_id),
    PRIMARY KEY (log_id, module_id)
);

CREATE INDEX IF NOT EXISTS group_members_user_idx ON group_members(user_id);

PRAGMA user_version = 1;
";
