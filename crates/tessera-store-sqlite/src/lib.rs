//! SQLite backend for the Tessera site and intel stores.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime.

mod analytics;
mod chat;
mod content;
mod encode;
mod intel;
mod schema;
mod session;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
