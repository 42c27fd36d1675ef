//! Persistent job store (SQLite via sqlx).
//!
//! One row per download job; no business logic beyond restart recovery.
//! The queue controller is the only writer.

mod db;
mod jobs;

pub use db::JobStore;

#[cfg(test)]
pub(crate) use db::open_memory;
