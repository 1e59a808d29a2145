//! Handlers for `/sections` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/sections` | Optional `?search=`, `?kind=`, `?status=` |
//! | `POST` | `/sections` | Body: [`NewSection`]; returns 201 |
//! | `GET`  | `/sections/:id` | Section with its ordered item links |
//! | `PUT`  | `/sections/:id` | Body: [`SectionUpdate`] |
//! | `DELETE` | `/sections/:id` | Removes every link to or from it |
//! | `POST` | `/sections/:id/duplicate` | `?page_id=` appends the clone to a page |
//! | `GET`  | `/sections/:id/items` | Links ordered by position |
//! | `POST` | `/sections/:id/items` | Body: `{"item_id":"…","status":"draft"}` |
//! | `PATCH` | `/sections/:id/items/:item_id` | Body: [`LinkUpdate`] |
//! | `DELETE` | `/sections/:id/items/:item_id` | Detach |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use tessera_core::{
  section::{NewSection, Section, SectionDetail, SectionItem, SectionKind, SectionUpdate},
  status::{LinkUpdate, PublishStatus},
  store::{ContentStore, SectionQuery},
};
use uuid::Uuid;

use crate::{ApiState, cache, error::ApiError, require, require_opt};

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub search: Option<String>,
  pub kind:   Option<SectionKind>,
  pub status: Option<PublishStatus>,
}

/// `GET /sections[?search=...][&kind=...][&status=...]`
pub async fn list<S: ContentStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Section>>, ApiError> {
  let sections = state
    .store
    .list_sections(SectionQuery {
      search: params.search,
      kind:   params.kind,
      status: params.status,
    })
    .await
    .map_err(ApiError::store)?;
  Ok(Json(sections))
}

/// `POST /sections`
pub async fn create<S: ContentStore>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewSection>,
) -> Result<impl IntoResponse, ApiError> {
  require("name", &body.name)?;
  let section = state.store.create_section(body).await.map_err(ApiError::store)?;
  state.cache.invalidate(cache::SECTIONS);
  Ok((StatusCode::CREATED, Json(section)))
}

/// `GET /sections/:id`
pub async fn get_one<S: ContentStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<SectionDetail>, ApiError> {
  let section = state
    .store
    .get_section(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("section", id))?;
  let items = state.store.section_items(id).await.map_err(ApiError::store)?;
  Ok(Json(SectionDetail { section, items }))
}

/// `PUT /sections/:id`
pub async fn update<S: ContentStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<SectionUpdate>,
) -> Result<Json<Section>, ApiError> {
  require_opt("name", body.name.as_deref())?;
  let section = state
    .store
    .update_section(id, body)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("section", id))?;
  state.cache.invalidate(cache::SECTIONS);
  Ok(Json(section))
}

/// `DELETE /sections/:id`
pub async fn delete_one<S: ContentStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  if !state.store.delete_section(id).await.map_err(ApiError::store)? {
    return Err(ApiError::not_found("section", id));
  }
  state.cache.invalidate(cache::SECTIONS);
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct DuplicateParams {
  pub page_id: Option<Uuid>,
}

/// `POST /sections/:id/duplicate[?page_id=...]`
///
/// The clone is named `<base> V<n>`; with `page_id` it is appended to that
/// page in the same transaction.
pub async fn duplicate<S: ContentStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<DuplicateParams>,
) -> Result<impl IntoResponse, ApiError> {
  let section = state
    .store
    .duplicate_section(id, params.page_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("section", id))?;
  state.cache.invalidate(cache::SECTIONS);
  if params.page_id.is_some() {
    state.cache.invalidate(cache::PAGES);
  }
  Ok((StatusCode::CREATED, Json(section)))
}

// ─── Item links ───────────────────────────────────────────────────────────────

/// `GET /sections/:id/items`
pub async fn list_items<S: ContentStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<SectionItem>>, ApiError> {
  state
    .store
    .get_section(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("section", id))?;
  let links = state.store.section_items(id).await.map_err(ApiError::store)?;
  Ok(Json(links))
}

#[derive(Debug, Deserialize)]
pub struct AttachBody {
  pub item_id: Uuid,
  #[serde(default)]
  pub status:  PublishStatus,
}

/// `POST /sections/:id/items`: appends the item after the last link.
pub async fn attach_item<S: ContentStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<AttachBody>,
) -> Result<impl IntoResponse, ApiError> {
  let link = state
    .store
    .attach_item(id, body.item_id, body.status)
    .await
    .map_err(ApiError::store)?;
  state.cache.invalidate(cache::SECTIONS);
  Ok((StatusCode::CREATED, Json(link)))
}

/// `PATCH /sections/:id/items/:item_id`
pub async fn update_link<S: ContentStore>(
  State(state): State<ApiState<S>>,
  Path((id, item_id)): Path<(Uuid, Uuid)>,
  Json(body): Json<LinkUpdate>,
) -> Result<Json<SectionItem>, ApiError> {
  let link = state
    .store
    .update_section_item(id, item_id, body)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("item {item_id} is not in section {id}")))?;
  state.cache.invalidate(cache::SECTIONS);
  Ok(Json(link))
}

/// `DELETE /sections/:id/items/:item_id`
pub async fn detach_item<S: ContentStore>(
  State(state): State<ApiState<S>>,
  Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
  if !state.store.detach_item(id, item_id).await.map_err(ApiError::store)? {
    return Err(ApiError::NotFound(format!("item {item_id} is not in section {id}")));
  }
  state.cache.invalidate(cache::SECTIONS);
  Ok(StatusCode::NO_CONTENT)
}
