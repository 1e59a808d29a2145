//! Handlers for `/research-subjects` endpoints.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use tessera_core::{
  intel::{NewResearchSubject, ResearchSubject, ResearchSubjectUpdate, SubjectQuery, Workflow},
  store::IntelStore,
};
use uuid::Uuid;

use crate::{ApiState, error::ApiError, require, require_opt};

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub search:   Option<String>,
  pub category: Option<String>,
}

/// `GET /research-subjects[?search=...][&category=...]`
pub async fn list<S: IntelStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<ResearchSubject>>, ApiError> {
  let subjects = state
    .store
    .list_subjects(SubjectQuery { search: params.search, category: params.category })
    .await
    .map_err(ApiError::store)?;
  Ok(Json(subjects))
}

/// `POST /research-subjects`
pub async fn create<S: IntelStore>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewResearchSubject>,
) -> Result<impl IntoResponse, ApiError> {
  require("name", &body.name)?;
  let subject = state.store.create_subject(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(subject)))
}

async fn load<S: IntelStore>(store: &S, id: Uuid) -> Result<ResearchSubject, ApiError> {
  store
    .get_subject(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("research subject", id))
}

/// `GET /research-subjects/:id`
pub async fn get_one<S: IntelStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<ResearchSubject>, ApiError> {
  Ok(Json(load(state.store.as_ref(), id).await?))
}

/// `PUT /research-subjects/:id`
pub async fn update<S: IntelStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ResearchSubjectUpdate>,
) -> Result<Json<ResearchSubject>, ApiError> {
  require_opt("name", body.name.as_deref())?;
  let subject = state
    .store
    .update_subject(id, body)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("research subject", id))?;
  Ok(Json(subject))
}

/// `DELETE /research-subjects/:id`
pub async fn delete_one<S: IntelStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  if !state.store.delete_subject(id).await.map_err(ApiError::store)? {
    return Err(ApiError::not_found("research subject", id));
  }
  Ok(StatusCode::NO_CONTENT)
}

/// `POST /research-subjects/:id/duplicate`: the clone is named
/// `<base> (Copy N)`.
pub async fn duplicate<S: IntelStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
  let subject = state
    .store
    .duplicate_subject(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("research subject", id))?;
  Ok((StatusCode::CREATED, Json(subject)))
}

/// `GET /research-subjects/:id/workflows`: active workflows targeting the
/// subject's project type. A subject without a type has none.
pub async fn workflows<S: IntelStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Workflow>>, ApiError> {
  let subject = load(state.store.as_ref(), id).await?;
  let Some(project_type_id) = subject.project_type_id else {
    return Ok(Json(Vec::new()));
  };
  let mut workflows = state
    .store
    .list_workflows(Some(project_type_id))
    .await
    .map_err(ApiError::store)?;
  workflows.retain(|w| w.active);
  Ok(Json(workflows))
}
