//! Handlers for `/documents` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/documents` | Optional `?kb_id=`, `?project_id=`, `?include_deleted=true` |
//! | `POST` | `/documents` | Body: [`NewDocument`]; the text is chunked |
//! | `GET`  | `/documents/:id` | Soft-deleted documents included |
//! | `DELETE` | `/documents/:id` | Soft delete, chunk purge, removal webhook; idempotent |
//! | `GET`  | `/documents/:id/chunks` | Ordered by ordinal |
//! | `POST` | `/documents/:id/projects/:project_id` | Link; idempotent |
//! | `DELETE` | `/documents/:id/projects/:project_id` | Unlink |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use tessera_core::{
  intel::{Chunk, Document, DocumentQuery, MAX_CHUNK_CHARS, NewDocument, chunk_text},
  store::IntelStore,
};
use uuid::Uuid;

use crate::{ApiState, error::ApiError, require};

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub kb_id:           Option<Uuid>,
  pub project_id:      Option<Uuid>,
  #[serde(default)]
  pub include_deleted: bool,
}

/// `GET /documents`
pub async fn list<S: IntelStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Document>>, ApiError> {
  let docs = state
    .store
    .list_documents(DocumentQuery {
      kb_id:           params.kb_id,
      project_id:      params.project_id,
      include_deleted: params.include_deleted,
    })
    .await
    .map_err(ApiError::store)?;
  Ok(Json(docs))
}

/// `POST /documents`
pub async fn create<S: IntelStore>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewDocument>,
) -> Result<impl IntoResponse, ApiError> {
  require("title", &body.title)?;
  let chunks = chunk_text(&body.text, MAX_CHUNK_CHARS);
  if chunks.is_empty() {
    return Err(ApiError::BadRequest("text must not be empty".into()));
  }
  let doc = state
    .store
    .create_document(body, chunks)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(document_id = %doc.document_id, chunks = doc.chunk_count, "document ingested");
  Ok((StatusCode::CREATED, Json(doc)))
}

/// `GET /documents/:id`
pub async fn get_one<S: IntelStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Document>, ApiError> {
  let doc = state
    .store
    .get_document(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("document", id))?;
  Ok(Json(doc))
}

/// `DELETE /documents/:id`
///
/// Only the soft delete must succeed. The chunk purge and the removal
/// webhook are best effort, and repeating the call is a no-op success.
pub async fn remove<S: IntelStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  let doc = state
    .store
    .get_document(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("document", id))?;

  let deleted_now = state
    .store
    .soft_delete_document(id)
    .await
    .map_err(ApiError::store)?;

  match state.store.purge_chunks(id).await {
    Ok(purged) => tracing::debug!(document_id = %id, purged, "chunks purged"),
    Err(e) => tracing::warn!(document_id = %id, error = %e, "chunk purge failed"),
  }

  if deleted_now {
    state.webhooks.notify_document_removed(id, doc.kb_id);
  }
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /documents/:id/chunks`
pub async fn chunks<S: IntelStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Chunk>>, ApiError> {
  state
    .store
    .get_document(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("document", id))?;
  let chunks = state.store.document_chunks(id).await.map_err(ApiError::store)?;
  Ok(Json(chunks))
}

/// `POST /documents/:id/projects/:project_id`
pub async fn link<S: IntelStore>(
  State(state): State<ApiState<S>>,
  Path((id, project_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
  state
    .store
    .link_document(id, project_id)
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /documents/:id/projects/:project_id`
pub async fn unlink<S: IntelStore>(
  State(state): State<ApiState<S>>,
  Path((id, project_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
  if !state
    .store
    .unlink_document(id, project_id)
    .await
    .map_err(ApiError::store)?
  {
    return Err(ApiError::NotFound(format!(
      "document {id} is not linked to project {project_id}"
    )));
  }
  Ok(StatusCode::NO_CONTENT)
}
