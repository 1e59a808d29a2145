//! Outbound webhook calls to the automation service.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;

/// Sends workflow triggers and document-removal notifications.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct WebhookClient {
  client:          Client,
  remove_document: Option<String>,
}

#[derive(Debug, Serialize)]
struct RemoveDocument {
  document_id: Uuid,
  kb_id:       Uuid,
}

impl WebhookClient {
  pub fn new(remove_document: Option<String>) -> Result<Self, reqwest::Error> {
    let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
    Ok(Self {
      client,
      remove_document: remove_document.filter(|url| !url.trim().is_empty()),
    })
  }

  /// Tell the vector pipeline a document is gone. Runs in the background;
  /// failures are logged and otherwise ignored.
  pub fn notify_document_removed(&self, document_id: Uuid, kb_id: Uuid) {
    let Some(url) = self.remove_document.clone() else {
      tracing::debug!(%document_id, "no removal webhook configured");
      return;
    };
    let client = self.client.clone();
    tokio::spawn(async move {
      let body = RemoveDocument { document_id, kb_id };
      match client.post(&url).json(&body).send().await {
        Ok(resp) if resp.status().is_success() => {
          tracing::debug!(%document_id, "removal webhook delivered");
        }
        Ok(resp) => {
          tracing::warn!(%document_id, status = %resp.status(), "removal webhook rejected");
        }
        Err(e) => {
          tracing::warn!(%document_id, error = %e, "removal webhook failed");
        }
      }
    });
  }

  /// Start a report-generation workflow. Any transport error or non-2xx
  /// answer is an upstream failure.
  pub async fn trigger<T: Serialize + ?Sized>(&self, url: &str, payload: &T) -> Result<(), ApiError> {
    let resp = self
      .client
      .post(url)
      .json(payload)
      .send()
      .await
      .map_err(|e| ApiError::Upstream(format!("workflow webhook: {e}")))?;
    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      return Err(ApiError::Upstream(format!("workflow webhook returned {status}: {body}")));
    }
    Ok(())
  }
}
