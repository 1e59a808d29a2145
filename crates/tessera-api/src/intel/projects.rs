//! Handlers for `/projects` and `/project-types` endpoints.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use tessera_core::{
  intel::{
    Document, DocumentQuery, NewProject, NewProjectType, Project, ProjectType,
    ProjectTypeUpdate, ProjectUpdate,
  },
  store::IntelStore,
};
use uuid::Uuid;

use crate::{ApiState, error::ApiError, require, require_opt};

// ─── Projects ─────────────────────────────────────────────────────────────────

/// `GET /projects`
pub async fn list<S: IntelStore>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<Project>>, ApiError> {
  let projects = state.store.list_projects().await.map_err(ApiError::store)?;
  Ok(Json(projects))
}

/// `POST /projects`
pub async fn create<S: IntelStore>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewProject>,
) -> Result<impl IntoResponse, ApiError> {
  require("name", &body.name)?;
  let project = state.store.create_project(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(project)))
}

/// `GET /projects/:id`
pub async fn get_one<S: IntelStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Project>, ApiError> {
  let project = state
    .store
    .get_project(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("project", id))?;
  Ok(Json(project))
}

/// `PUT /projects/:id`
pub async fn update<S: IntelStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ProjectUpdate>,
) -> Result<Json<Project>, ApiError> {
  require_opt("name", body.name.as_deref())?;
  let project = state
    .store
    .update_project(id, body)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("project", id))?;
  Ok(Json(project))
}

/// `DELETE /projects/:id`
pub async fn delete_one<S: IntelStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  if !state.store.delete_project(id).await.map_err(ApiError::store)? {
    return Err(ApiError::not_found("project", id));
  }
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /projects/:id/documents`: live documents only.
pub async fn documents<S: IntelStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Document>>, ApiError> {
  state
    .store
    .get_project(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("project", id))?;
  let docs = state
    .store
    .list_documents(DocumentQuery { project_id: Some(id), ..Default::default() })
    .await
    .map_err(ApiError::store)?;
  Ok(Json(docs))
}

// ─── Project types ────────────────────────────────────────────────────────────

/// `GET /project-types`
pub async fn list_types<S: IntelStore>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<ProjectType>>, ApiError> {
  let types = state.store.list_project_types().await.map_err(ApiError::store)?;
  Ok(Json(types))
}

/// `POST /project-types`: a missing slug is derived from the name.
pub async fn create_type<S: IntelStore>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewProjectType>,
) -> Result<impl IntoResponse, ApiError> {
  require("name", &body.name)?;
  let ty = state
    .store
    .create_project_type(body)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(ty)))
}

/// `PUT /project-types/:id`
pub async fn update_type<S: IntelStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ProjectTypeUpdate>,
) -> Result<Json<ProjectType>, ApiError> {
  require_opt("name", body.name.as_deref())?;
  let ty = state
    .store
    .update_project_type(id, body)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("project type", id))?;
  Ok(Json(ty))
}

/// `DELETE /project-types/:id`: projects, workflows and subjects keep
/// existing without a type.
pub async fn delete_type<S: IntelStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  if !state.store.delete_project_type(id).await.map_err(ApiError::store)? {
    return Err(ApiError::not_found("project type", id));
  }
  Ok(StatusCode::NO_CONTENT)
}
