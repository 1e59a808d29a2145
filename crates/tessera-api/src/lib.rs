//! JSON REST API for Tessera.
//!
//! Exposes an axum [`Router`] backed by any [`tessera_core::store::SiteStore`]:
//! the admin API under `/api/admin`, the intel API under `/api/intel`, the
//! chat API under `/api/chat` and the public site reads. Authentication and
//! transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = tessera_api::router(state).layer(auth_layer);
//! ```

pub mod admin;
pub mod cache;
pub mod chat;
pub mod error;
pub mod intel;
pub mod site;
pub mod webhook;

use std::sync::Arc;

use axum::Router;
use tessera_core::{chat::ChatGateway, store::SiteStore};

pub use cache::TagCache;
pub use chat::openrouter::OpenRouter;
pub use error::ApiError;
pub use webhook::WebhookClient;

/// Deployment settings the handlers read.
#[derive(Debug, Clone, Default)]
pub struct ApiSettings {
  /// Public origin of the site, used for sitemap locations and workflow
  /// callbacks.
  pub base_url:  String,
  /// CDN origin that relative media paths resolve against.
  pub pull_zone: Option<String>,
  /// Hosts, besides loopback and `*.local`, whose analytics are dropped.
  pub dev_hosts: Vec<String>,
}

/// Shared state threaded through all handlers.
pub struct ApiState<S> {
  pub store:    Arc<S>,
  pub cache:    Arc<TagCache>,
  pub chat:     Arc<dyn ChatGateway>,
  pub webhooks: WebhookClient,
  pub settings: Arc<ApiSettings>,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      store:    self.store.clone(),
      cache:    self.cache.clone(),
      chat:     self.chat.clone(),
      webhooks: self.webhooks.clone(),
      settings: self.settings.clone(),
    }
  }
}

/// Build the fully-materialised API router for `state`.
pub fn router<S>(state: ApiState<S>) -> Router<()>
where
  S: SiteStore + 'static,
{
  Router::new()
    .nest("/api/admin", admin::router::<S>())
    .nest("/api/intel", intel::router::<S>())
    .nest("/api/chat", chat::router::<S>())
    .merge(site::router::<S>())
    .with_state(state)
}

/// Reject blank required text fields.
pub(crate) fn require(field: &str, value: &str) -> Result<(), ApiError> {
  if value.trim().is_empty() {
    return Err(ApiError::BadRequest(format!("{field} must not be empty")));
  }
  Ok(())
}

/// Reject a blank replacement for a required text field.
pub(crate) fn require_opt(field: &str, value: Option<&str>) -> Result<(), ApiError> {
  match value {
    Some(v) => require(field, v),
    None => Ok(()),
  }
}

#[cfg(test)]
mod tests;
