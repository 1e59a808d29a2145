//! [`ChatGateway`] over the OpenRouter chat-completions endpoint.

use std::time::Duration;

use futures_util::{FutureExt as _, future::BoxFuture};
use reqwest::Client;
use serde::Serialize;
use tessera_core::chat::{
  ChatGateway, CompletionRequest, DeltaStream, GatewayError, PromptMessage,
};

use super::sse::delta_stream;

pub const ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
  model:    &'a str,
  messages: &'a [PromptMessage],
  stream:   bool,
}

/// Streams completions from OpenRouter. Without an API key every request
/// fails with [`GatewayError::NotConfigured`].
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct OpenRouter {
  client:   Client,
  api_key:  Option<String>,
  model:    String,
  endpoint: String,
  referer:  Option<String>,
}

impl OpenRouter {
  pub fn new(api_key: Option<String>, model: Option<String>) -> Result<Self, reqwest::Error> {
    // No overall timeout: a streamed reply may legitimately take minutes.
    let client = Client::builder()
      .connect_timeout(Duration::from_secs(10))
      .user_agent(concat!("tessera/", env!("CARGO_PKG_VERSION")))
      .build()?;
    Ok(Self {
      client,
      api_key: api_key.filter(|k| !k.trim().is_empty()),
      model: model.unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
      endpoint: ENDPOINT.to_owned(),
      referer: None,
    })
  }

  /// Point at another OpenAI-compatible endpoint.
  pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
    self.endpoint = endpoint.into();
    self
  }

  /// Site origin reported to OpenRouter for attribution.
  pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
    self.referer = Some(referer.into());
    self
  }

  pub fn is_configured(&self) -> bool { self.api_key.is_some() }

  async fn start(&self, request: CompletionRequest) -> Result<DeltaStream, GatewayError> {
    let key = self.api_key.as_deref().ok_or(GatewayError::NotConfigured)?;
    let model = request.model.as_deref().unwrap_or(&self.model);
    let body = CompletionBody { model, messages: &request.messages, stream: true };

    let mut req = self
      .client
      .post(&self.endpoint)
      .bearer_auth(key)
      .header(reqwest::header::ACCEPT, "text/event-stream")
      .json(&body);
    if let Some(referer) = &self.referer {
      req = req.header(reqwest::header::REFERER, referer);
    }

    let resp = req
      .send()
      .await
      .map_err(|e| GatewayError::Transport(e.to_string()))?;
    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      return Err(GatewayError::Upstream { status: status.as_u16(), body });
    }

    tracing::debug!(model, "completion stream started");
    Ok(delta_stream(resp.bytes_stream()))
  }
}

impl ChatGateway for OpenRouter {
  fn default_model(&self) -> &str { &self.model }

  fn stream_completion(
    &self,
    request: CompletionRequest,
  ) -> BoxFuture<'_, Result<DeltaStream, GatewayError>> {
    self.start(request).boxed()
  }
}
