//! Handlers for the content item collections: `/faqs`, `/testimonials`,
//! `/features`, `/ctas`, `/timeline` and `/media`.
//!
//! Every collection shares these handlers; the [`ItemKind`] arrives as a
//! route extension. Request bodies are the bare value of the kind, e.g.
//! `{"question":"…","answer":"…"}` for FAQs.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/{collection}` | Optional `?search=` over the label |
//! | `POST` | `/{collection}` | Returns 201 |
//! | `GET`  | `/{collection}/:id` | |
//! | `PUT`  | `/{collection}/:id` | Replaces the value |
//! | `DELETE` | `/{collection}/:id` | |
//! | `POST` | `/{collection}/:id/duplicate` | `?section_id=` appends the clone |

use axum::{
  Extension, Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use tessera_core::{
  item::{Item, ItemKind, ItemValue},
  store::ContentStore,
};
use uuid::Uuid;

use crate::{ApiState, cache, error::ApiError, require};

/// Parse a request body as a value of `kind` and normalize its URLs.
fn parse_value(kind: ItemKind, body: serde_json::Value) -> Result<ItemValue, ApiError> {
  let mut value = ItemValue::from_parts(kind, body)?;
  require(kind.label_field(), value.label())?;
  value.normalize(None);
  Ok(value)
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub search: Option<String>,
}

/// `GET /{collection}[?search=...]`
pub async fn list<S: ContentStore>(
  State(state): State<ApiState<S>>,
  Extension(kind): Extension<ItemKind>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Item>>, ApiError> {
  let items = state
    .store
    .list_items(kind, params.search)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(items))
}

/// `POST /{collection}`
pub async fn create<S: ContentStore>(
  State(state): State<ApiState<S>>,
  Extension(kind): Extension<ItemKind>,
  Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, ApiError> {
  let value = parse_value(kind, body)?;
  let item = state.store.create_item(value).await.map_err(ApiError::store)?;
  state.cache.invalidate(cache::ITEMS);
  Ok((StatusCode::CREATED, Json(item)))
}

/// `GET /{collection}/:id`
pub async fn get_one<S: ContentStore>(
  State(state): State<ApiState<S>>,
  Extension(kind): Extension<ItemKind>,
  Path(id): Path<Uuid>,
) -> Result<Json<Item>, ApiError> {
  let item = state
    .store
    .get_item(kind, id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found(kind.as_str(), id))?;
  Ok(Json(item))
}

/// `PUT /{collection}/:id`
pub async fn update<S: ContentStore>(
  State(state): State<ApiState<S>>,
  Extension(kind): Extension<ItemKind>,
  Path(id): Path<Uuid>,
  Json(body): Json<serde_json::Value>,
) -> Result<Json<Item>, ApiError> {
  let value = parse_value(kind, body)?;
  // An id of another kind is not part of this collection.
  state
    .store
    .get_item(kind, id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found(kind.as_str(), id))?;
  let item = state
    .store
    .update_item(id, value)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found(kind.as_str(), id))?;
  state.cache.invalidate(cache::ITEMS);
  Ok(Json(item))
}

/// `DELETE /{collection}/:id`
pub async fn delete_one<S: ContentStore>(
  State(state): State<ApiState<S>>,
  Extension(kind): Extension<ItemKind>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  if !state.store.delete_item(kind, id).await.map_err(ApiError::store)? {
    return Err(ApiError::not_found(kind.as_str(), id));
  }
  state.cache.invalidate(cache::ITEMS);
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct DuplicateParams {
  pub section_id: Option<Uuid>,
}

/// `POST /{collection}/:id/duplicate[?section_id=...]`
///
/// The clone's label gains a ` (Copy N)` suffix; with `section_id` it is
/// appended to that section in the same transaction.
pub async fn duplicate<S: ContentStore>(
  State(state): State<ApiState<S>>,
  Extension(kind): Extension<ItemKind>,
  Path(id): Path<Uuid>,
  Query(params): Query<DuplicateParams>,
) -> Result<impl IntoResponse, ApiError> {
  let item = state
    .store
    .duplicate_item(kind, id, params.section_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found(kind.as_str(), id))?;
  state.cache.invalidate(cache::ITEMS);
  Ok((StatusCode::CREATED, Json(item)))
}
