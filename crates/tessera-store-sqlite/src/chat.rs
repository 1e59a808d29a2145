//! [`ChatStore`] for [`SqliteStore`].

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _};
use tessera_core::{
  chat::{ChatContext, ChatMessage, ChatRole, Conversation, NewConversation},
  store::ChatStore,
};
use uuid::Uuid;

use crate::{
  encode::{encode_dt, encode_uuid, RawConversation, RawMessage, CONVERSATION_COLS},
  store::{exists, Outcome, SqliteStore},
  Result,
};

/// Title of a conversation created without one.
const UNTITLED: &str = "New conversation";

fn conversation_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<RawConversation>> {
  conn
    .query_row(
      &format!("SELECT {CONVERSATION_COLS} FROM conversations WHERE conversation_id = ?1"),
      [id],
      RawConversation::from_row,
    )
    .optional()
}

impl ChatStore for SqliteStore {
  async fn create_conversation(&self, input: NewConversation) -> Result<Conversation> {
    let now = Utc::now();
    let conversation = Conversation {
      conversation_id: Uuid::new_v4(),
      title:           input
        .title
        .map(|t| t.trim().to_owned())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED.to_owned()),
      kb_id:           input.kb_id,
      project_id:      input.project_id,
      created_at:      now,
      updated_at:      now,
    };

    let id_str = encode_uuid(conversation.conversation_id);
    let title = conversation.title.clone();
    let kb_str = conversation.kb_id.map(encode_uuid);
    let project_str = conversation.project_id.map(encode_uuid);
    let at_str = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO conversations (conversation_id, title, kb_id, project_id, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
          rusqlite::params![id_str, title, kb_str, project_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(conversation)
  }

  async fn get_conversation(&self, id: Uuid) -> Result<Option<Conversation>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| Ok(conversation_by_id(conn, &id_str)?))
      .await?;
    raw.map(RawConversation::into_conversation).transpose()
  }

  async fn list_conversations(&self) -> Result<Vec<Conversation>> {
    let raws = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CONVERSATION_COLS} FROM conversations
           ORDER BY updated_at DESC, created_at DESC"
        ))?;
        let rows = stmt
          .query_map([], RawConversation::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawConversation::into_conversation).collect()
  }

  async fn delete_conversation(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM conversations WHERE conversation_id = ?1", [id_str])?)
      })
      .await?;
    Ok(deleted > 0)
  }

  async fn set_context(&self, id: Uuid, context: ChatContext) -> Result<Option<Conversation>> {
    let id_str = encode_uuid(id);
    let kb_str = context.kb_id.map(encode_uuid);
    let project_str = context.project_id.map(encode_uuid);
    let at_str = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE conversations SET kb_id = ?2, project_id = ?3, updated_at = ?4
           WHERE conversation_id = ?1",
          rusqlite::params![id_str, kb_str, project_str, at_str],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(conversation_by_id(conn, &id_str)?)
      })
      .await?;

    raw.map(RawConversation::into_conversation).transpose()
  }

  async fn append_message(
    &self,
    conversation_id: Uuid,
    role: ChatRole,
    content: String,
    model: Option<String>,
  ) -> Result<ChatMessage> {
    let message = ChatMessage {
      message_id: Uuid::new_v4(),
      conversation_id,
      role,
      content,
      model,
      created_at: Utc::now(),
    };

    let id_str = encode_uuid(message.message_id);
    let conv_str = encode_uuid(conversation_id);
    let content = message.content.clone();
    let model = message.model.clone();
    let at_str = encode_dt(message.created_at);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !exists(&tx, "conversations", "conversation_id", &conv_str)? {
          return Ok(Outcome::Missing("conversation", conversation_id));
        }
        let seq: i64 = tx.query_row(
          "SELECT COALESCE(MAX(seq) + 1, 0) FROM chat_messages WHERE conversation_id = ?1",
          [&conv_str],
          |row| row.get(0),
        )?;
        tx.execute(
          "INSERT INTO chat_messages (message_id, conversation_id, seq, role, content, model, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![id_str, conv_str, seq, role.as_str(), content, model, at_str],
        )?;
        tx.execute(
          "UPDATE conversations SET updated_at = ?2 WHERE conversation_id = ?1",
          [&conv_str, &at_str],
        )?;
        tx.commit()?;
        Ok(Outcome::Done(()))
      })
      .await?;

    outcome.into_result()?;
    Ok(message)
  }

  async fn messages(&self, conversation_id: Uuid) -> Result<Vec<ChatMessage>> {
    let id_str = encode_uuid(conversation_id);
    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT message_id, conversation_id, role, content, model, created_at
           FROM chat_messages WHERE conversation_id = ?1 ORDER BY seq",
        )?;
        let rows = stmt
          .query_map([id_str], RawMessage::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawMessage::into_message).collect()
  }
}
