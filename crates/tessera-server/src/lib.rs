//! HTTP server assembly for Tessera: configuration, operator sessions and the
//! full application router.

pub mod auth;
pub mod config;

pub use config::ServerConfig;

use axum::{Router, middleware};
use tessera_api::ApiState;
use tessera_core::store::SiteStore;
use tower_http::trace::TraceLayer;

use auth::AuthState;

/// The complete application: API routes behind the session guard, the auth
/// routes, and request tracing.
pub fn app<S>(api: ApiState<S>, auth: AuthState<S>) -> Router
where
  S: SiteStore + 'static,
{
  tessera_api::router(api)
    .layer(middleware::from_fn_with_state(auth.clone(), auth::require_session::<S>))
    .merge(auth::router(auth))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use chrono::Duration;
  use rand_core::OsRng;
  use serde_json::{Value, json};
  use tessera_api::{ApiSettings, OpenRouter, TagCache, WebhookClient};
  use tessera_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;
  use crate::auth::{AuthConfig, COOKIE_NAME};

  async fn make_app(password: &str) -> Router {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string();

    let api = ApiState {
      store:    store.clone(),
      cache:    Arc::new(TagCache::new()),
      chat:     Arc::new(OpenRouter::new(None, None).unwrap()),
      webhooks: WebhookClient::new(None).unwrap(),
      settings: Arc::new(ApiSettings {
        base_url: "http://localhost:8080".into(),
        ..ApiSettings::default()
      }),
    };
    let auth = AuthState {
      store,
      auth: Arc::new(AuthConfig {
        username:       "admin".into(),
        password_hash:  hash,
        session_ttl:    Duration::hours(1),
        secure_cookies: false,
      }),
    };
    app(api, auth)
  }

  async fn oneshot(
    app: &Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
  ) -> axum::response::Response {
    let mut builder = Request::builder().method(method).uri(uri).header(header::HOST, "example.com");
    if let Some(cookie) = cookie {
      builder = builder.header(header::COOKIE, cookie);
    }
    let body = match body {
      Some(json) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(json.to_string())
      }
      None => Body::empty(),
    };
    app.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
  }

  /// `name=value` of the session cookie set by a login response.
  fn session_cookie(resp: &axum::response::Response) -> String {
    let set_cookie = resp.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    set_cookie.split(';').next().unwrap().to_owned()
  }

  #[tokio::test]
  async fn admin_routes_require_a_session() {
    let app = make_app("secret").await;
    let resp = oneshot(&app, "GET", "/api/admin/pages", None, None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = oneshot(&app, "GET", "/api/chat/conversations", Some("tessera_session=bogus"), None)
      .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn public_routes_need_no_session() {
    let app = make_app("secret").await;
    assert_eq!(oneshot(&app, "GET", "/health", None, None).await.status(), StatusCode::OK);
    assert_eq!(oneshot(&app, "GET", "/sitemap.xml", None, None).await.status(), StatusCode::OK);

    let event = json!({ "event_type": "click", "entity_type": "cta", "entity_id": "hero" });
    let resp = oneshot(&app, "POST", "/api/admin/analytics", None, Some(event)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    // Reading the ledger is still guarded.
    let resp = oneshot(&app, "GET", "/api/admin/analytics", None, None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn login_session_logout_cycle() {
    let app = make_app("secret").await;

    let bad = json!({ "username": "admin", "password": "wrong" });
    let resp = oneshot(&app, "POST", "/api/auth/login", None, Some(bad)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let good = json!({ "username": "admin", "password": "secret" });
    let resp = oneshot(&app, "POST", "/api/auth/login", None, Some(good)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = session_cookie(&resp);
    assert!(cookie.starts_with(&format!("{COOKIE_NAME}=")));
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let session: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(session["username"], "admin");
    assert!(session.get("token_hash").is_none());

    let resp = oneshot(&app, "GET", "/api/admin/pages", Some(&cookie), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = oneshot(&app, "GET", "/api/auth/session", Some(&cookie), None).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = oneshot(&app, "POST", "/api/auth/logout", Some(&cookie), None).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let cleared = resp.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cleared.contains("Max-Age=0"));

    let resp = oneshot(&app, "GET", "/api/admin/pages", Some(&cookie), None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let resp = oneshot(&app, "GET", "/api/auth/session", Some(&cookie), None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }
}
