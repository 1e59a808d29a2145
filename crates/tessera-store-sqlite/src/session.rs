//! [`SessionStore`] for [`SqliteStore`].

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use tessera_core::{session::Session, store::SessionStore};

use crate::{
  encode::{encode_dt, RawSession},
  store::SqliteStore,
  Result,
};

impl SessionStore for SqliteStore {
  async fn create_session(&self, session: Session) -> Result<()> {
    let created = encode_dt(session.created_at);
    let expires = encode_dt(session.expires_at);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (token_hash, username, created_at, expires_at)
           VALUES (?1, ?2, ?3, ?4)",
          [session.token_hash, session.username, created, expires],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn find_session(&self, token_hash: String) -> Result<Option<Session>> {
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT token_hash, username, created_at, expires_at
               FROM sessions WHERE token_hash = ?1",
              [token_hash],
              |row| {
                Ok(RawSession {
                  token_hash: row.get(0)?,
                  username:   row.get(1)?,
                  created_at: row.get(2)?,
                  expires_at: row.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawSession::into_session).transpose()
  }

  async fn delete_session(&self, token_hash: String) -> Result<bool> {
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM sessions WHERE token_hash = ?1", [token_hash])?)
      })
      .await?;
    Ok(deleted > 0)
  }

  async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
    let now_str = encode_dt(now);
    let purged = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", [now_str])?)
      })
      .await?;
    Ok(purged as u64)
  }
}
