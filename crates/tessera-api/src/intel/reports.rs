//! Handlers for `/reports` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/reports` | Optional `?subject_id=`; newest first, without bodies |
//! | `POST` | `/reports` | Workflow callback: `{"run_id":…,"body":{…}}` or `{"run_id":…,"error":"…"}` |
//! | `GET`  | `/reports/:run_id` | Stored report, body as received |
//! | `GET`  | `/reports/:run_id/view` | [`ReportView`] as JSON |
//! | `GET`  | `/reports/:run_id/html` | Standalone HTML dashboard |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use tessera_core::{
  intel::{Report, ReportSummary, RunStatus},
  store::IntelStore,
};
use tessera_report::{ReportView, build_view, render_html};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub subject_id: Option<Uuid>,
}

/// `GET /reports[?subject_id=...]`
pub async fn list<S: IntelStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<ReportSummary>>, ApiError> {
  let reports = state
    .store
    .list_reports(params.subject_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(reports))
}

#[derive(Debug, Deserialize)]
pub struct CallbackBody {
  pub run_id: Uuid,
  pub body:   Option<serde_json::Value>,
  /// Set by the automation when generation failed.
  pub error:  Option<String>,
}

/// `POST /reports`
pub async fn callback<S: IntelStore>(
  State(state): State<ApiState<S>>,
  Json(callback): Json<CallbackBody>,
) -> Result<Response, ApiError> {
  let run_id = callback.run_id;
  if let Some(error) = callback.error {
    let run = state
      .store
      .finish_run(run_id, RunStatus::Failed, Some(error))
      .await
      .map_err(ApiError::store)?
      .ok_or_else(|| ApiError::not_found("run", run_id))?;
    tracing::warn!(%run_id, "workflow reported failure");
    return Ok(Json(run).into_response());
  }

  let body = callback
    .body
    .ok_or_else(|| ApiError::BadRequest("either body or error is required".into()))?;
  let report = state
    .store
    .save_report(run_id, body)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(%run_id, "report received");
  Ok((StatusCode::CREATED, Json(report)).into_response())
}

async fn load<S: IntelStore>(store: &S, run_id: Uuid) -> Result<Report, ApiError> {
  store
    .get_report(run_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("report", run_id))
}

/// `GET /reports/:run_id`
pub async fn get_one<S: IntelStore>(
  State(state): State<ApiState<S>>,
  Path(run_id): Path<Uuid>,
) -> Result<Json<Report>, ApiError> {
  Ok(Json(load(state.store.as_ref(), run_id).await?))
}

/// `GET /reports/:run_id/view`
pub async fn view<S: IntelStore>(
  State(state): State<ApiState<S>>,
  Path(run_id): Path<Uuid>,
) -> Result<Json<ReportView>, ApiError> {
  let report = load(state.store.as_ref(), run_id).await?;
  Ok(Json(build_view(&report.body)))
}

/// `GET /reports/:run_id/html`
pub async fn html<S: IntelStore>(
  State(state): State<ApiState<S>>,
  Path(run_id): Path<Uuid>,
) -> Result<Html<String>, ApiError> {
  let report = load(state.store.as_ref(), run_id).await?;
  let view = build_view(&report.body);
  if !view.missing_sections.is_empty() {
    tracing::debug!(%run_id, missing = ?view.missing_sections, "report has absent sections");
  }
  Ok(Html(render_html(&view)))
}
