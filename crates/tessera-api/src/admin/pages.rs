//! Handlers for `/pages` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/pages` | Optional `?search=`, `?status=` |
//! | `POST` | `/pages` | Body: [`NewPage`]; returns 201 |
//! | `GET`  | `/pages/:id` | Page with its ordered section links |
//! | `PUT`  | `/pages/:id` | Body: [`PageUpdate`] |
//! | `DELETE` | `/pages/:id` | Sections survive |
//! | `POST` | `/pages/:id/duplicate` | Draft clone with its links |
//! | `GET`  | `/pages/:id/sections` | Links ordered by position |
//! | `POST` | `/pages/:id/sections` | Body: `{"section_id":"…","status":"draft"}` |
//! | `PUT`  | `/pages/:id/sections` | Body: `[{"section_id":"…","status":"…"}]` |
//! | `PATCH` | `/pages/:id/sections/:section_id` | Body: [`LinkUpdate`] |
//! | `DELETE` | `/pages/:id/sections/:section_id` | Detach |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use tessera_core::{
  page::{NewPage, Page, PageDetail, PageSection, PageUpdate, SectionLinkInput},
  status::{LinkUpdate, PublishStatus},
  store::{ContentStore, PageQuery},
};
use uuid::Uuid;

use crate::{ApiState, cache, error::ApiError, require, require_opt};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub search: Option<String>,
  pub status: Option<PublishStatus>,
}

/// `GET /pages[?search=...][&status=...]`
pub async fn list<S: ContentStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Page>>, ApiError> {
  let pages = state
    .store
    .list_pages(PageQuery { search: params.search, status: params.status })
    .await
    .map_err(ApiError::store)?;
  Ok(Json(pages))
}

// ─── CRUD ─────────────────────────────────────────────────────────────────────

/// `POST /pages`
pub async fn create<S: ContentStore>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewPage>,
) -> Result<impl IntoResponse, ApiError> {
  require("title", &body.title)?;
  let page = state.store.create_page(body).await.map_err(ApiError::store)?;
  state.cache.invalidate(cache::PAGES);
  Ok((StatusCode::CREATED, Json(page)))
}

/// `GET /pages/:id`
pub async fn get_one<S: ContentStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<PageDetail>, ApiError> {
  let page = state
    .store
    .get_page(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("page", id))?;
  let sections = state.store.page_sections(id).await.map_err(ApiError::store)?;
  Ok(Json(PageDetail { page, sections }))
}

/// `PUT /pages/:id`
pub async fn update<S: ContentStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<PageUpdate>,
) -> Result<Json<Page>, ApiError> {
  require_opt("title", body.title.as_deref())?;
  let page = state
    .store
    .update_page(id, body)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("page", id))?;
  state.cache.invalidate(cache::PAGES);
  Ok(Json(page))
}

/// `DELETE /pages/:id`
pub async fn delete_one<S: ContentStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  if !state.store.delete_page(id).await.map_err(ApiError::store)? {
    return Err(ApiError::not_found("page", id));
  }
  state.cache.invalidate(cache::PAGES);
  Ok(StatusCode::NO_CONTENT)
}

/// `POST /pages/:id/duplicate`
pub async fn duplicate<S: ContentStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
  let page = state
    .store
    .duplicate_page(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("page", id))?;
  state.cache.invalidate(cache::PAGES);
  Ok((StatusCode::CREATED, Json(page)))
}

// ─── Section links ────────────────────────────────────────────────────────────

/// `GET /pages/:id/sections`
pub async fn list_sections<S: ContentStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<PageSection>>, ApiError> {
  state
    .store
    .get_page(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("page", id))?;
  let links = state.store.page_sections(id).await.map_err(ApiError::store)?;
  Ok(Json(links))
}

#[derive(Debug, Deserialize)]
pub struct AttachBody {
  pub section_id: Uuid,
  #[serde(default)]
  pub status:     PublishStatus,
}

/// `POST /pages/:id/sections`: appends the section after the last link.
pub async fn attach_section<S: ContentStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<AttachBody>,
) -> Result<impl IntoResponse, ApiError> {
  let link = state
    .store
    .attach_section(id, body.section_id, body.status)
    .await
    .map_err(ApiError::store)?;
  state.cache.invalidate(cache::PAGES);
  Ok((StatusCode::CREATED, Json(link)))
}

/// `PUT /pages/:id/sections`: the list order becomes the position.
pub async fn replace_sections<S: ContentStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<Vec<SectionLinkInput>>,
) -> Result<Json<Vec<PageSection>>, ApiError> {
  let links = state
    .store
    .replace_page_sections(id, body)
    .await
    .map_err(ApiError::store)?;
  state.cache.invalidate(cache::PAGES);
  Ok(Json(links))
}

/// `PATCH /pages/:id/sections/:section_id`
pub async fn update_link<S: ContentStore>(
  State(state): State<ApiState<S>>,
  Path((id, section_id)): Path<(Uuid, Uuid)>,
  Json(body): Json<LinkUpdate>,
) -> Result<Json<PageSection>, ApiError> {
  let link = state
    .store
    .update_page_section(id, section_id, body)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("section {section_id} is not on page {id}")))?;
  state.cache.invalidate(cache::PAGES);
  Ok(Json(link))
}

/// `DELETE /pages/:id/sections/:section_id`
pub async fn detach_section<S: ContentStore>(
  State(state): State<ApiState<S>>,
  Path((id, section_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
  if !state.store.detach_section(id, section_id).await.map_err(ApiError::store)? {
    return Err(ApiError::NotFound(format!("section {section_id} is not on page {id}")));
  }
  state.cache.invalidate(cache::PAGES);
  Ok(StatusCode::NO_CONTENT)
}
