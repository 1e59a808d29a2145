//! [`SqliteStore`], the SQLite implementation of every Tessera store trait.
//!
//! The trait impls live in sibling modules, one per domain.

use std::path::Path;

use tessera_core::store::Backend;

use crate::{schema::SCHEMA, Error, Result};

/// A Tessera store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    tracing::debug!(path = %path.display(), "sqlite store opened");
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
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

impl Backend for SqliteStore {
  type Error = Error;
}

/// Result of a multi-step write whose preconditions are checked inside the
/// transaction. `Missing` rolls the transaction back.
pub(crate) enum Outcome<T> {
  Done(T),
  Missing(&'static str, uuid::Uuid),
}

impl<T> Outcome<T> {
  pub(crate) fn into_result(self) -> Result<T> {
    match self {
      Self::Done(value) => Ok(value),
      Self::Missing(entity, id) => Err(Error::not_found(entity, id)),
    }
  }
}

/// Whether a row with `column = id` exists in `table`.
pub(crate) fn exists(
  conn: &rusqlite::Connection,
  table: &str,
  column: &str,
  id: &str,
) -> rusqlite::Result<bool> {
  use rusqlite::OptionalExtension as _;
  Ok(
    conn
      .query_row(
        &format!("SELECT 1 FROM {table} WHERE {column} = ?1"),
        [id],
        |_| Ok(()),
      )
      .optional()?
      .is_some(),
  )
}

/// Every value of a single-column query, e.g. the names of a duplicate
/// lineage.
pub(crate) fn column_values(
  conn: &rusqlite::Connection,
  sql: &str,
  params: impl rusqlite::Params,
) -> rusqlite::Result<Vec<String>> {
  let mut stmt = conn.prepare(sql)?;
  let values = stmt
    .query_map(params, |row| row.get(0))?
    .collect::<rusqlite::Result<Vec<String>>>()?;
  Ok(values)
}
