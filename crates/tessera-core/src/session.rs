//! Operator login sessions.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A login session. Only the SHA-256 digest of the bearer token is stored.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
  #[serde(skip_serializing)]
  pub token_hash: String,
  pub username:   String,
  pub created_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
}

impl Session {
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool { now >= self.expires_at }
}
