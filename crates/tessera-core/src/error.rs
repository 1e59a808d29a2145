//! Error types for `tessera-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown status: {0:?}")]
  UnknownStatus(String),

  #[error("unknown item kind: {0:?}")]
  UnknownItemKind(String),

  #[error("unknown section kind: {0:?}")]
  UnknownSectionKind(String),

  #[error("hsl component out of range: h={h}, s={s}, l={l}")]
  HslOutOfRange { h: f64, s: f64, l: f64 },

  #[error("invalid hsl color: {0:?}")]
  InvalidHsl(String),

  #[error("invalid theme token name: {0:?}")]
  InvalidToken(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
