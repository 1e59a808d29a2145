//! Chat conversations and the gateway abstraction over the LLM provider.

use chrono::{DateTime, Utc};
use futures_util::{future::BoxFuture, stream::BoxStream};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use thiserror::Error;
use uuid::Uuid;

// ─── Conversations ───────────────────────────────────────────────────────────

/// A chat thread. `kb_id` and `project_id` select the documents retrieved as
/// context for each reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
  pub conversation_id: Uuid,
  pub title:           String,
  pub kb_id:           Option<Uuid>,
  pub project_id:      Option<Uuid>,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewConversation {
  pub title:      Option<String>,
  pub kb_id:      Option<Uuid>,
  pub project_id: Option<Uuid>,
}

/// Retrieval context of a conversation. Replaces both fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatContext {
  pub kb_id:      Option<Uuid>,
  pub project_id: Option<Uuid>,
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChatRole {
  System,
  User,
  Assistant,
}

impl ChatRole {
  pub fn as_str(self) -> &'static str { self.into() }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
  pub message_id:      Uuid,
  pub conversation_id: Uuid,
  pub role:            ChatRole,
  pub content:         String,
  /// Model that produced an assistant message.
  pub model:           Option<String>,
  pub created_at:      DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationDetail {
  #[serde(flatten)]
  pub conversation: Conversation,
  pub messages:     Vec<ChatMessage>,
}

// ─── Gateway ─────────────────────────────────────────────────────────────────

/// One prompt message as sent upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
  pub role:    ChatRole,
  pub content: String,
}

/// A streamed chat-completions request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
  /// Falls back to the gateway's configured default.
  pub model:    Option<String>,
  pub messages: Vec<PromptMessage>,
}

#[derive(Debug, Error)]
pub enum GatewayError {
  #[error("chat gateway is not configured")]
  NotConfigured,

  #[error("upstream returned {status}: {body}")]
  Upstream { status: u16, body: String },

  #[error("transport error: {0}")]
  Transport(String),

  #[error("malformed upstream event: {0}")]
  Decode(String),
}

/// Content deltas in arrival order. The stream ends when the upstream
/// completion ends.
pub type DeltaStream = BoxStream<'static, Result<String, GatewayError>>;

/// A provider of streamed chat completions.
///
/// Object-safe so the HTTP layer can hold an `Arc<dyn ChatGateway>`.
pub trait ChatGateway: Send + Sync {
  /// The model used when a request does not name one.
  fn default_model(&self) -> &str;

  /// Start a completion. Errors before the first byte of the response
  /// (connect, auth, non-2xx status) are returned here; errors after that
  /// arrive through the stream.
  fn stream_completion(
    &self,
    request: CompletionRequest,
  ) -> BoxFuture<'_, Result<DeltaStream, GatewayError>>;
}
