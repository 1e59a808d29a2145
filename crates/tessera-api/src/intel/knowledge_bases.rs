//! Handlers for `/knowledge-bases` endpoints.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use tessera_core::{
  intel::{KnowledgeBase, KnowledgeBaseUpdate, NewKnowledgeBase},
  store::IntelStore,
};
use uuid::Uuid;

use crate::{ApiState, error::ApiError, require, require_opt};

/// `GET /knowledge-bases`
pub async fn list<S: IntelStore>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<KnowledgeBase>>, ApiError> {
  let kbs = state.store.list_knowledge_bases().await.map_err(ApiError::store)?;
  Ok(Json(kbs))
}

/// `POST /knowledge-bases`
pub async fn create<S: IntelStore>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewKnowledgeBase>,
) -> Result<impl IntoResponse, ApiError> {
  require("name", &body.name)?;
  let kb = state
    .store
    .create_knowledge_base(body)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(kb)))
}

/// `GET /knowledge-bases/:id`
pub async fn get_one<S: IntelStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<KnowledgeBase>, ApiError> {
  let kb = state
    .store
    .get_knowledge_base(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("knowledge base", id))?;
  Ok(Json(kb))
}

/// `PUT /knowledge-bases/:id`
pub async fn update<S: IntelStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<KnowledgeBaseUpdate>,
) -> Result<Json<KnowledgeBase>, ApiError> {
  require_opt("name", body.name.as_deref())?;
  let kb = state
    .store
    .update_knowledge_base(id, body)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("knowledge base", id))?;
  Ok(Json(kb))
}

/// `DELETE /knowledge-bases/:id`: documents and chunks go with it.
pub async fn delete_one<S: IntelStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  if !state.store.delete_knowledge_base(id).await.map_err(ApiError::store)? {
    return Err(ApiError::not_found("knowledge base", id));
  }
  Ok(StatusCode::NO_CONTENT)
}
