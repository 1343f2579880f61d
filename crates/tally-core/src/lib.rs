//! Core types and trait definitions for the Tally attendance tracker.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::AttendanceStore`]; the
//! [`service::AttendanceService`] turns beacon reports into daily logs.

// Store impls use native `async fn` against `impl Future + Send` signatures.
#![allow(async_fn_in_trait)]

pub mod directory;
pub mod error;
pub mod ledger;
pub mod matcher;
pub mod password;
pub mod service;
pub mod store;
pub mod window;

pub use error::{Error, Result};
