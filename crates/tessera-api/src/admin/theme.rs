//! Handlers for `/theme`.
//!
//! The theme is stored as HSL tokens in the settings table; responses carry
//! the computed hex value of every token next to its HSL triple.

use std::collections::BTreeMap;

use axum::{Json, extract::State};
use serde::Serialize;
use tessera_core::{
  store::ContentStore,
  theme::{THEME_SETTING, Theme, ThemeToken},
};

use crate::{ApiState, cache, error::ApiError};

#[derive(Debug, Serialize)]
pub struct ThemeResponse {
  pub tokens: BTreeMap<String, ThemeToken>,
}

/// The stored theme, or the default one when none was saved yet.
pub(crate) async fn load<S: ContentStore>(store: &S) -> Result<Theme, ApiError> {
  match store
    .get_setting(THEME_SETTING.to_owned())
    .await
    .map_err(ApiError::store)?
  {
    Some(value) => serde_json::from_value(value).map_err(|e| ApiError::Store(Box::new(e))),
    None => Ok(Theme::default()),
  }
}

/// `GET /theme`
pub async fn get_theme<S: ContentStore>(
  State(state): State<ApiState<S>>,
) -> Result<Json<ThemeResponse>, ApiError> {
  let theme = load(state.store.as_ref()).await?;
  Ok(Json(ThemeResponse { tokens: theme.resolved()? }))
}

/// `PUT /theme`, body: `{"tokens":{"primary":{"h":222,"s":47,"l":11}}}`
pub async fn put_theme<S: ContentStore>(
  State(state): State<ApiState<S>>,
  Json(theme): Json<Theme>,
) -> Result<Json<ThemeResponse>, ApiError> {
  theme.validate()?;
  let value = serde_json::to_value(&theme).map_err(|e| ApiError::Store(Box::new(e)))?;
  state
    .store
    .put_setting(THEME_SETTING.to_owned(), value)
    .await
    .map_err(ApiError::store)?;
  state.cache.invalidate(cache::THEME);
  Ok(Json(ThemeResponse { tokens: theme.resolved()? }))
}
