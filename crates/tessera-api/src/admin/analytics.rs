//! Handlers for `/analytics` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/analytics` | Raw events, newest first; `scope`, `event_type`, `entity_type`, `entity_id`, `limit`, `offset` |
//! | `POST` | `/analytics` | Public ingest; dev hosts answer 202 `{"skipped":true}` |
//! | `GET`  | `/analytics/summary` | Aggregates for `?scope=7\|30\|90\|all` |
//! | `GET`  | `/analytics/top` | Most frequent entities |

use axum::{
  Json,
  extract::{Query, State},
  http::{HeaderMap, StatusCode, header},
  response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tessera_core::{
  analytics::{
    AnalyticsEvent, AnalyticsSummary, EntityCount, EventQuery, NewEvent, Scope, is_dev_host,
  },
  store::AnalyticsStore,
};

use crate::{ApiState, error::ApiError, require};

const MAX_EVENTS: usize = 1000;
const DEFAULT_TOP: usize = 10;
const MAX_TOP: usize = 100;

// ─── Raw events ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  #[serde(default)]
  pub scope:       Scope,
  pub event_type:  Option<String>,
  pub entity_type: Option<String>,
  pub entity_id:   Option<String>,
  /// Default 100, at most 1000.
  pub limit:       Option<usize>,
  pub offset:      Option<usize>,
}

/// `GET /analytics`
pub async fn list<S: AnalyticsStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<AnalyticsEvent>>, ApiError> {
  let events = state
    .store
    .list_events(EventQuery {
      since:       params.scope.since(Utc::now()),
      event_type:  params.event_type,
      entity_type: params.entity_type,
      entity_id:   params.entity_id,
      limit:       params.limit.map(|l| l.min(MAX_EVENTS)),
      offset:      params.offset,
    })
    .await
    .map_err(ApiError::store)?;
  Ok(Json(events))
}

// ─── Ingest ───────────────────────────────────────────────────────────────────

fn header_text<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
  headers
    .get(name)
    .and_then(|v| v.to_str().ok())
    .map(str::trim)
    .filter(|v| !v.is_empty())
}

/// Country and city as reported by the edge network in front of the site.
pub fn geo_from_headers(headers: &HeaderMap) -> (Option<String>, Option<String>) {
  let country = header_text(headers, "cf-ipcountry")
    .or_else(|| header_text(headers, "x-vercel-ip-country"))
    // Cloudflare reports unknown and Tor traffic as XX and T1.
    .filter(|c| !matches!(*c, "XX" | "T1"))
    .map(str::to_owned);
  let city = header_text(headers, "x-vercel-ip-city").map(str::to_owned);
  (country, city)
}

/// `POST /analytics`
pub async fn ingest<S: AnalyticsStore>(
  State(state): State<ApiState<S>>,
  headers: HeaderMap,
  Json(mut body): Json<NewEvent>,
) -> Result<Response, ApiError> {
  require("event_type", &body.event_type)?;

  let host = header_text(&headers, header::HOST.as_str()).unwrap_or_default();
  if is_dev_host(host, &state.settings.dev_hosts) {
    tracing::debug!(host, event_type = %body.event_type, "dev host event skipped");
    return Ok((StatusCode::ACCEPTED, Json(json!({ "skipped": true }))).into_response());
  }

  let (country, city) = geo_from_headers(&headers);
  if body.country.is_none() {
    body.country = country;
  }
  if body.city.is_none() {
    body.city = city;
  }

  let event = state.store.record_event(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(event)).into_response())
}

// ─── Aggregates ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
  #[serde(default)]
  pub scope: Scope,
}

/// `GET /analytics/summary[?scope=...]`
pub async fn summary<S: AnalyticsStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<SummaryParams>,
) -> Result<Json<AnalyticsSummary>, ApiError> {
  let summary = state
    .store
    .summarize(params.scope.since(Utc::now()))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(summary))
}

#[derive(Debug, Deserialize)]
pub struct TopParams {
  #[serde(default)]
  pub scope:       Scope,
  pub event_type:  Option<String>,
  pub entity_type: Option<String>,
  /// Default 10, at most 100.
  pub limit:       Option<usize>,
}

/// `GET /analytics/top[?scope=...][&event_type=...][&entity_type=...][&limit=...]`
pub async fn top<S: AnalyticsStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<TopParams>,
) -> Result<Json<Vec<EntityCount>>, ApiError> {
  let limit = params.limit.unwrap_or(DEFAULT_TOP).clamp(1, MAX_TOP);
  let top = state
    .store
    .top_entities(
      params.scope.since(Utc::now()),
      params.event_type,
      params.entity_type,
      limit,
    )
    .await
    .map_err(ApiError::store)?;
  Ok(Json(top))
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  #[test]
  fn geo_prefers_cloudflare_and_drops_unknown() {
    let mut headers = HeaderMap::new();
    headers.insert("x-vercel-ip-country", HeaderValue::from_static("DE"));
    headers.insert("x-vercel-ip-city", HeaderValue::from_static("Berlin"));
    assert_eq!(geo_from_headers(&headers), (Some("DE".into()), Some("Berlin".into())));

    headers.insert("cf-ipcountry", HeaderValue::from_static("FR"));
    assert_eq!(geo_from_headers(&headers).0.as_deref(), Some("FR"));

    headers.insert("cf-ipcountry", HeaderValue::from_static("XX"));
    headers.remove("x-vercel-ip-country");
    assert_eq!(geo_from_headers(&headers).0, None);
  }
}
