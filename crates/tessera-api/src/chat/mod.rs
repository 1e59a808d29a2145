//! The chat API, mounted under `/api/chat`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/conversations` | Most recently active first |
//! | `POST` | `/conversations` | Body: [`NewConversation`] |
//! | `GET`  | `/conversations/:id` | With messages, oldest first |
//! | `DELETE` | `/conversations/:id` | |
//! | `GET`  | `/conversations/:id/context` | `?q=` previews the chunks a question would retrieve |
//! | `PUT`  | `/conversations/:id/context` | Body: [`ChatContext`] |
//! | `POST` | `/conversations/:id/messages` | Body: `{"content":"…","model":"…"}`; SSE reply |
//!
//! The reply stream carries `delta` events (`{"content":"…"}`) followed by
//! one `done` event holding the stored assistant message, or one `error`
//! event when the upstream stream breaks or yields no content. Nothing is
//! stored after an error.

pub mod openrouter;
pub mod prompt;
pub mod sse;

use std::{convert::Infallible, sync::Arc};

use axum::{
  Json, Router,
  extract::{Path, Query, State},
  http::StatusCode,
  response::{
    IntoResponse,
    sse::{Event, KeepAlive, Sse},
  },
  routing::{get, post},
};
use futures_util::{Stream, StreamExt as _, stream};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tessera_core::{
  chat::{
    ChatContext, ChatRole, CompletionRequest, Conversation, ConversationDetail, DeltaStream,
    NewConversation,
  },
  intel::{Chunk, ChunkQuery},
  store::{ChatStore, IntelStore, SiteStore},
};
use uuid::Uuid;

use crate::{ApiState, error::ApiError, require};
use prompt::{CONTEXT_CHUNKS, build_prompt, search_terms};

pub fn router<S>() -> Router<ApiState<S>>
where
  S: SiteStore + 'static,
{
  Router::new()
    .route("/conversations", get(list::<S>).post(create::<S>))
    .route("/conversations/{id}", get(get_one::<S>).delete(delete_one::<S>))
    .route(
      "/conversations/{id}/context",
      get(get_context::<S>).put(put_context::<S>),
    )
    .route("/conversations/{id}/messages", post(send_message::<S>))
}

// ─── Conversations ────────────────────────────────────────────────────────────

/// `GET /conversations`
pub async fn list<S: ChatStore>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<Conversation>>, ApiError> {
  let conversations = state.store.list_conversations().await.map_err(ApiError::store)?;
  Ok(Json(conversations))
}

/// `POST /conversations`
pub async fn create<S: ChatStore + IntelStore>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewConversation>,
) -> Result<impl IntoResponse, ApiError> {
  check_context(
    state.store.as_ref(),
    &ChatContext { kb_id: body.kb_id, project_id: body.project_id },
  )
  .await?;
  let conversation = state
    .store
    .create_conversation(body)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(conversation)))
}

async fn load<S: ChatStore>(store: &S, id: Uuid) -> Result<Conversation, ApiError> {
  store
    .get_conversation(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("conversation", id))
}

/// `GET /conversations/:id`
pub async fn get_one<S: ChatStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<ConversationDetail>, ApiError> {
  let conversation = load(state.store.as_ref(), id).await?;
  let messages = state.store.messages(id).await.map_err(ApiError::store)?;
  Ok(Json(ConversationDetail { conversation, messages }))
}

/// `DELETE /conversations/:id`
pub async fn delete_one<S: ChatStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  if !state.store.delete_conversation(id).await.map_err(ApiError::store)? {
    return Err(ApiError::not_found("conversation", id));
  }
  Ok(StatusCode::NO_CONTENT)
}

// ─── Context ──────────────────────────────────────────────────────────────────

/// Both ends of a context must exist.
async fn check_context<S: IntelStore>(store: &S, context: &ChatContext) -> Result<(), ApiError> {
  if let Some(kb_id) = context.kb_id
    && store
      .get_knowledge_base(kb_id)
      .await
      .map_err(ApiError::store)?
      .is_none()
  {
    return Err(ApiError::not_found("knowledge base", kb_id));
  }
  if let Some(project_id) = context.project_id
    && store
      .get_project(project_id)
      .await
      .map_err(ApiError::store)?
      .is_none()
  {
    return Err(ApiError::not_found("project", project_id));
  }
  Ok(())
}

/// Chunks matching `text` within the conversation's context. A conversation
/// without context retrieves nothing.
async fn retrieve<S: IntelStore>(
  store: &S,
  conversation: &Conversation,
  text: &str,
) -> Result<Vec<Chunk>, ApiError> {
  if conversation.kb_id.is_none() && conversation.project_id.is_none() {
    return Ok(Vec::new());
  }
  store
    .search_chunks(ChunkQuery {
      kb_id:      conversation.kb_id,
      project_id: conversation.project_id,
      terms:      search_terms(text),
      limit:      CONTEXT_CHUNKS,
    })
    .await
    .map_err(ApiError::store)
}

#[derive(Debug, Deserialize)]
pub struct ContextParams {
  pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ContextPreview {
  #[serde(flatten)]
  pub context: ChatContext,
  pub chunks:  Vec<Chunk>,
}

/// `GET /conversations/:id/context[?q=...]`
pub async fn get_context<S: ChatStore + IntelStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<ContextParams>,
) -> Result<Json<ContextPreview>, ApiError> {
  let conversation = load(state.store.as_ref(), id).await?;
  let chunks = match params.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
    Some(q) => retrieve(state.store.as_ref(), &conversation, q).await?,
    None => Vec::new(),
  };
  Ok(Json(ContextPreview {
    context: ChatContext { kb_id: conversation.kb_id, project_id: conversation.project_id },
    chunks,
  }))
}

/// `PUT /conversations/:id/context`
pub async fn put_context<S: ChatStore + IntelStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(context): Json<ChatContext>,
) -> Result<Json<Conversation>, ApiError> {
  check_context(state.store.as_ref(), &context).await?;
  let conversation = state
    .store
    .set_context(id, context)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("conversation", id))?;
  Ok(Json(conversation))
}

// ─── Messages ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MessageBody {
  pub content: String,
  pub model:   Option<String>,
}

/// `POST /conversations/:id/messages`
///
/// Stores the user message, then streams the reply. Errors before the
/// upstream stream starts are plain JSON errors (502, or 503 without an
/// API key).
pub async fn send_message<S: ChatStore + IntelStore + 'static>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<MessageBody>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
  require("content", &body.content)?;
  let conversation = load(state.store.as_ref(), id).await?;

  state
    .store
    .append_message(id, ChatRole::User, body.content.clone(), None)
    .await
    .map_err(ApiError::store)?;
  let history = state.store.messages(id).await.map_err(ApiError::store)?;
  let chunks = retrieve(state.store.as_ref(), &conversation, &body.content).await?;

  let model = body
    .model
    .filter(|m| !m.trim().is_empty())
    .unwrap_or_else(|| state.chat.default_model().to_owned());
  let deltas = state
    .chat
    .stream_completion(CompletionRequest {
      model:    Some(model.clone()),
      messages: build_prompt(&chunks, &history),
    })
    .await?;

  tracing::debug!(conversation_id = %id, %model, context = chunks.len(), "relaying reply");
  let relay = Relay {
    store: state.store.clone(),
    conversation_id: id,
    model,
    phase: Phase::Streaming { deltas, reply: String::new() },
  };
  Ok(Sse::new(relay.into_events()).keep_alive(KeepAlive::default()))
}

enum Phase {
  Streaming { deltas: DeltaStream, reply: String },
  Finished,
}

/// Forwards upstream deltas and stores the accumulated reply at the end.
struct Relay<S> {
  store:           Arc<S>,
  conversation_id: Uuid,
  model:           String,
  phase:           Phase,
}

fn error_event(message: &str) -> Event {
  Event::default().event("error").data(json!({ "error": message }).to_string())
}

impl<S: ChatStore + 'static> Relay<S> {
  fn into_events(self) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    stream::unfold(self, |mut relay| async move {
      let Phase::Streaming { deltas, reply } = &mut relay.phase else {
        return None;
      };
      let event = match deltas.next().await {
        Some(Ok(delta)) => {
          reply.push_str(&delta);
          Event::default().event("delta").data(json!({ "content": delta }).to_string())
        }
        Some(Err(e)) => {
          tracing::warn!(conversation_id = %relay.conversation_id, error = %e, "reply stream broke");
          relay.phase = Phase::Finished;
          error_event(&e.to_string())
        }
        None if reply.is_empty() => {
          tracing::warn!(conversation_id = %relay.conversation_id, "reply stream ended empty");
          relay.phase = Phase::Finished;
          error_event("the model returned an empty reply")
        }
        None => {
          let reply = std::mem::take(reply);
          relay.phase = Phase::Finished;
          match relay
            .store
            .append_message(
              relay.conversation_id,
              ChatRole::Assistant,
              reply,
              Some(relay.model.clone()),
            )
            .await
          {
            Ok(message) => Event::default()
              .event("done")
              .data(serde_json::to_string(&message).unwrap_or_default()),
            Err(e) => {
              tracing::error!(conversation_id = %relay.conversation_id, error = %e, "could not store reply");
              error_event(&e.to_string())
            }
          }
        }
      };
      Some((Ok(event), relay))
    })
  }
}
