//! Handlers for `/workflows` and `/runs` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/workflows` | Optional `?project_type_id=` |
//! | `POST` | `/workflows` | Body: [`NewWorkflow`] |
//! | `GET`, `PUT`, `DELETE` | `/workflows/:id` | |
//! | `POST` | `/workflows/:id/run` | Body: `{"subject_id":"…"}`; returns 202 + the pending run |
//! | `GET`  | `/runs/:run_id` | Run status |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tessera_core::{
  intel::{NewWorkflow, ResearchSubject, RunStatus, Workflow, WorkflowRun, WorkflowUpdate},
  store::IntelStore,
};
use uuid::Uuid;

use crate::{ApiState, error::ApiError, require, require_opt};

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub project_type_id: Option<Uuid>,
}

/// `GET /workflows[?project_type_id=...]`
pub async fn list<S: IntelStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Workflow>>, ApiError> {
  let workflows = state
    .store
    .list_workflows(params.project_type_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(workflows))
}

/// `POST /workflows`
pub async fn create<S: IntelStore>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewWorkflow>,
) -> Result<impl IntoResponse, ApiError> {
  require("name", &body.name)?;
  require("webhook_url", &body.webhook_url)?;
  let workflow = state.store.create_workflow(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(workflow)))
}

/// `GET /workflows/:id`
pub async fn get_one<S: IntelStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Workflow>, ApiError> {
  let workflow = state
    .store
    .get_workflow(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("workflow", id))?;
  Ok(Json(workflow))
}

/// `PUT /workflows/:id`
pub async fn update<S: IntelStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<WorkflowUpdate>,
) -> Result<Json<Workflow>, ApiError> {
  require_opt("name", body.name.as_deref())?;
  require_opt("webhook_url", body.webhook_url.as_deref())?;
  let workflow = state
    .store
    .update_workflow(id, body)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("workflow", id))?;
  Ok(Json(workflow))
}

/// `DELETE /workflows/:id`
pub async fn delete_one<S: IntelStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  if !state.store.delete_workflow(id).await.map_err(ApiError::store)? {
    return Err(ApiError::not_found("workflow", id));
  }
  Ok(StatusCode::NO_CONTENT)
}

// ─── Runs ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RunBody {
  pub subject_id: Uuid,
}

/// What the workflow webhook receives. The automation posts its report to
/// `callback_url` as `{"run_id": …, "body": …}`.
#[derive(Debug, Serialize)]
struct Trigger<'a> {
  run_id:       Uuid,
  workflow_id:  Uuid,
  subject:      &'a ResearchSubject,
  callback_url: String,
}

/// `POST /workflows/:id/run`
///
/// Records a pending run and calls the workflow webhook. When the webhook
/// fails the run is marked failed and the call answers 502.
pub async fn run<S: IntelStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<RunBody>,
) -> Result<impl IntoResponse, ApiError> {
  let workflow = state
    .store
    .get_workflow(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("workflow", id))?;
  if !workflow.active {
    return Err(ApiError::BadRequest(format!("workflow {id} is inactive")));
  }
  let subject = state
    .store
    .get_subject(body.subject_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("research subject", body.subject_id))?;

  let run = state
    .store
    .create_run(id, subject.subject_id)
    .await
    .map_err(ApiError::store)?;

  let trigger = Trigger {
    run_id:       run.run_id,
    workflow_id:  id,
    subject:      &subject,
    callback_url: format!(
      "{}/api/intel/reports",
      state.settings.base_url.trim_end_matches('/')
    ),
  };
  if let Err(e) = state.webhooks.trigger(&workflow.webhook_url, &trigger).await {
    tracing::warn!(run_id = %run.run_id, error = %e, "workflow trigger failed");
    if let Err(store_err) = state
      .store
      .finish_run(run.run_id, RunStatus::Failed, Some(e.to_string()))
      .await
    {
      tracing::warn!(run_id = %run.run_id, error = %store_err, "could not mark run failed");
    }
    return Err(e);
  }

  tracing::info!(run_id = %run.run_id, workflow_id = %id, "workflow triggered");
  Ok((StatusCode::ACCEPTED, Json(run)))
}

/// `GET /runs/:run_id`
pub async fn get_run<S: IntelStore>(
  State(state): State<ApiState<S>>,
  Path(run_id): Path<Uuid>,
) -> Result<Json<WorkflowRun>, ApiError> {
  let run = state
    .store
    .get_run(run_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("run", run_id))?;
  Ok(Json(run))
}
