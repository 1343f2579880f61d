//! SQLite backend for the Tally attendance store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every call is funnelled through that
//! one connection, and ledger commits run inside an immediate transaction, so
//! commits for the same `(user, date)` are serialized.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
