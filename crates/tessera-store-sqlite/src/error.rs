//! Error type for `tessera-store-sqlite`.

use rusqlite::ffi;
use tessera_core::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] tessera_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unrecognised column value: {0}")]
  Decode(String),

  /// A row that an operation needs to exist was not found.
  #[error("{entity} not found: {id}")]
  NotFound { entity: &'static str, id: uuid::Uuid },

  /// An item update tried to change the kind of an item.
  #[error("item {id} is a {stored}, not a {given}")]
  KindMismatch {
    id:     uuid::Uuid,
    stored: String,
    given:  String,
  },
}

impl Error {
  pub(crate) fn not_found(entity: &'static str, id: uuid::Uuid) -> Self {
    Self::NotFound { entity, id }
  }
}

impl StoreError for Error {
  fn is_not_found(&self) -> bool { matches!(self, Self::NotFound { .. }) }

  fn is_conflict(&self) -> bool {
    match self {
      Self::Database(tokio_rusqlite::Error::Rusqlite(
        rusqlite::Error::SqliteFailure(e, _),
      )) => matches!(
        e.extended_code,
        ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY
      ),
      _ => false,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
