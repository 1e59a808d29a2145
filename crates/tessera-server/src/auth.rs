//! Operator login with cookie sessions, and the middleware guarding the
//! authenticated API prefixes.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/api/auth/login` | Body: `{"username":"…","password":"…"}`; sets the cookie |
//! | `POST` | `/api/auth/logout` | Deletes the session, clears the cookie |
//! | `GET`  | `/api/auth/session` | Current session or 401 |

use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  Json, Router,
  extract::{Request, State},
  http::{HeaderMap, HeaderValue, Method, StatusCode, header},
  middleware::Next,
  response::{IntoResponse, Response},
  routing::{get, post},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{Duration, Utc};
use rand_core::{OsRng, RngCore as _};
use serde::Deserialize;
use sha2::{Digest as _, Sha256};
use tessera_api::ApiError;
use tessera_core::{session::Session, store::SessionStore};

pub const COOKIE_NAME: &str = "tessera_session";

/// Prefixes that require a session.
const PROTECTED: &[&str] = &["/api/admin", "/api/intel", "/api/chat"];

/// The single operator account.
#[derive(Clone)]
pub struct AuthConfig {
  pub username:       String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash:  String,
  pub session_ttl:    Duration,
  /// Adds `Secure` to the session cookie.
  pub secure_cookies: bool,
}

pub struct AuthState<S> {
  pub store: Arc<S>,
  pub auth:  Arc<AuthConfig>,
}

impl<S> Clone for AuthState<S> {
  fn clone(&self) -> Self { Self { store: self.store.clone(), auth: self.auth.clone() } }
}

pub fn router<S>(state: AuthState<S>) -> Router
where
  S: SessionStore + 'static,
{
  Router::new()
    .route("/api/auth/login", post(login::<S>))
    .route("/api/auth/logout", post(logout::<S>))
    .route("/api/auth/session", get(session::<S>))
    .with_state(state)
}

// ─── Tokens and cookies ───────────────────────────────────────────────────────

fn new_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  URL_SAFE_NO_PAD.encode(bytes)
}

/// Sessions are stored under this digest, never the raw token.
pub fn hash_token(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

/// The session token carried by the request's cookies, if any.
pub fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
  headers
    .get_all(header::COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(';'))
    .filter_map(|pair| pair.trim().split_once('='))
    .find(|(name, _)| *name == COOKIE_NAME)
    .map(|(_, value)| value.trim())
    .filter(|value| !value.is_empty())
}

fn cookie(auth: &AuthConfig, value: &str, max_age: i64) -> Result<HeaderValue, ApiError> {
  let secure = if auth.secure_cookies { "; Secure" } else { "" };
  HeaderValue::from_str(&format!(
    "{COOKIE_NAME}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}{secure}"
  ))
  .map_err(|e| ApiError::Store(Box::new(e)))
}

fn verify_password(auth: &AuthConfig, username: &str, password: &str) -> Result<(), ApiError> {
  if username != auth.username {
    return Err(ApiError::Unauthorized);
  }
  let parsed = PasswordHash::new(&auth.password_hash).map_err(|_| ApiError::Unauthorized)?;
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .map_err(|_| ApiError::Unauthorized)
}

/// The live session of the request, if any. Expired sessions count as absent.
pub async fn current_session<S: SessionStore>(
  store: &S,
  headers: &HeaderMap,
) -> Result<Option<Session>, ApiError> {
  let Some(token) = token_from_headers(headers) else {
    return Ok(None);
  };
  let session = store
    .find_session(hash_token(token))
    .await
    .map_err(ApiError::store)?;
  Ok(session.filter(|s| !s.is_expired(Utc::now())))
}

// ─── Handlers ─────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct LoginBody {
  pub username: String,
  pub password: String,
}

/// `POST /api/auth/login`
pub async fn login<S: SessionStore>(
  State(state): State<AuthState<S>>,
  Json(body): Json<LoginBody>,
) -> Result<Response, ApiError> {
  if let Err(e) = verify_password(&state.auth, &body.username, &body.password) {
    tracing::warn!(username = %body.username, "login rejected");
    return Err(e);
  }

  let now = Utc::now();
  match state.store.purge_expired_sessions(now).await {
    Ok(0) => {}
    Ok(purged) => tracing::debug!(purged, "expired sessions removed"),
    Err(e) => tracing::warn!(error = %e, "could not purge expired sessions"),
  }

  let token = new_token();
  let session = Session {
    token_hash: hash_token(&token),
    username:   body.username,
    created_at: now,
    expires_at: now + state.auth.session_ttl,
  };
  state
    .store
    .create_session(session.clone())
    .await
    .map_err(ApiError::store)?;
  tracing::info!(username = %session.username, "operator logged in");

  let set_cookie = cookie(&state.auth, &token, state.auth.session_ttl.num_seconds())?;
  Ok(([(header::SET_COOKIE, set_cookie)], Json(session)).into_response())
}

/// `POST /api/auth/logout`
pub async fn logout<S: SessionStore>(
  State(state): State<AuthState<S>>,
  headers: HeaderMap,
) -> Result<Response, ApiError> {
  if let Some(token) = token_from_headers(&headers) {
    state
      .store
      .delete_session(hash_token(token))
      .await
      .map_err(ApiError::store)?;
  }
  let clear = cookie(&state.auth, "", 0)?;
  Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, clear)]).into_response())
}

/// `GET /api/auth/session`
pub async fn session<S: SessionStore>(
  State(state): State<AuthState<S>>,
  headers: HeaderMap,
) -> Result<Json<Session>, ApiError> {
  current_session(state.store.as_ref(), &headers)
    .await?
    .map(Json)
    .ok_or(ApiError::Unauthorized)
}

// ─── Middleware ───────────────────────────────────────────────────────────────

/// Event ingestion from the public site and report callbacks from the
/// automation service arrive without a session.
fn is_public(method: &Method, path: &str) -> bool {
  *method == Method::POST
    && matches!(path.trim_end_matches('/'), "/api/admin/analytics" | "/api/intel/reports")
}

pub fn is_protected(method: &Method, path: &str) -> bool {
  let guarded = PROTECTED.iter().any(|prefix| {
    path
      .strip_prefix(prefix)
      .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
  });
  guarded && !is_public(method, path)
}

/// Reject requests to protected paths that carry no live session.
pub async fn require_session<S: SessionStore>(
  State(state): State<AuthState<S>>,
  req: Request,
  next: Next,
) -> Response {
  if !is_protected(req.method(), req.uri().path()) {
    return next.run(req).await;
  }
  match current_session(state.store.as_ref(), req.headers()).await {
    Ok(Some(_)) => next.run(req).await,
    Ok(None) => ApiError::Unauthorized.into_response(),
    Err(e) => e.into_response(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn protected_prefixes_and_public_exceptions() {
    assert!(is_protected(&Method::GET, "/api/admin/pages"));
    assert!(is_protected(&Method::GET, "/api/chat"));
    assert!(is_protected(&Method::GET, "/api/admin/analytics"));
    assert!(!is_protected(&Method::POST, "/api/admin/analytics"));
    assert!(!is_protected(&Method::POST, "/api/intel/reports/"));
    assert!(is_protected(&Method::GET, "/api/intel/reports"));
    assert!(!is_protected(&Method::GET, "/api/administrator"));
    assert!(!is_protected(&Method::GET, "/api/site/pages/home"));
    assert!(!is_protected(&Method::POST, "/api/auth/login"));
  }

  #[test]
  fn token_is_read_from_any_cookie_header() {
    let mut headers = HeaderMap::new();
    headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));
    headers.append(
      header::COOKIE,
      HeaderValue::from_static("a=1; tessera_session=abc123 ; b=2"),
    );
    assert_eq!(token_from_headers(&headers), Some("abc123"));

    let mut empty = HeaderMap::new();
    empty.insert(header::COOKIE, HeaderValue::from_static("tessera_session="));
    assert_eq!(token_from_headers(&empty), None);
  }

  #[test]
  fn tokens_are_url_safe_and_hashes_are_hex() {
    let token = new_token();
    assert_eq!(token.len(), 43);
    assert!(token.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_'));
    let digest = hash_token(&token);
    assert_eq!(digest.len(), 64);
    assert_ne!(hash_token(&new_token()), digest);
  }
}
