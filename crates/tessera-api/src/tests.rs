use std::sync::Arc;

use axum::{
  body::{Body, Bytes},
  http::{Request, StatusCode, header},
};
use futures_util::{FutureExt as _, StreamExt as _, future::BoxFuture, stream};
use serde_json::{Value, json};
use tessera_core::{
  chat::{ChatGateway, CompletionRequest, DeltaStream, GatewayError},
  store::IntelStore,
};
use tessera_store_sqlite::SqliteStore;
use tower::ServiceExt as _;
use uuid::Uuid;

use crate::{ApiSettings, ApiState, OpenRouter, TagCache, WebhookClient, router};

// ── Harness ──────────────────────────────────────────────────────────────────

/// Replays canned deltas, optionally breaking after them.
struct FakeGateway {
  deltas: Vec<&'static str>,
  breaks: bool,
}

impl ChatGateway for FakeGateway {
  fn default_model(&self) -> &str { "fake/model" }

  fn stream_completion(
    &self,
    _request: CompletionRequest,
  ) -> BoxFuture<'_, Result<DeltaStream, GatewayError>> {
    let mut items: Vec<Result<String, GatewayError>> =
      self.deltas.iter().map(|d| Ok((*d).to_owned())).collect();
    if self.breaks {
      items.push(Err(GatewayError::Transport("connection reset".into())));
    }
    async move { Ok(stream::iter(items).boxed()) }.boxed()
  }
}

async fn make_state_with(chat: Arc<dyn ChatGateway>) -> ApiState<SqliteStore> {
  ApiState {
    store: Arc::new(SqliteStore::open_in_memory().await.unwrap()),
    cache: Arc::new(TagCache::new()),
    chat,
    webhooks: WebhookClient::new(None).unwrap(),
    settings: Arc::new(ApiSettings {
      base_url:  "https://example.com".into(),
      pull_zone: Some("https://cdn.example.com".into()),
      dev_hosts: vec!["staging.example.com".into()],
    }),
  }
}

async fn make_state() -> ApiState<SqliteStore> {
  make_state_with(Arc::new(FakeGateway { deltas: vec!["Hel", "lo"], breaks: false })).await
}

async fn send(
  state: &ApiState<SqliteStore>,
  method: &str,
  uri: &str,
  headers: Vec<(&str, &str)>,
  body: Option<Value>,
) -> (StatusCode, Option<String>, Bytes) {
  let mut builder = Request::builder().method(method).uri(uri);
  for (k, v) in headers {
    builder = builder.header(k, v);
  }
  let body = match body {
    Some(json) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(json.to_string())
    }
    None => Body::empty(),
  };
  let resp = router(state.clone()).oneshot(builder.body(body).unwrap()).await.unwrap();
  let status = resp.status();
  let content_type = resp
    .headers()
    .get(header::CONTENT_TYPE)
    .and_then(|v| v.to_str().ok())
    .map(str::to_owned);
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  (status, content_type, bytes)
}

async fn call(
  state: &ApiState<SqliteStore>,
  method: &str,
  uri: &str,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let (status, _, bytes) = send(state, method, uri, vec![], body).await;
  let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
  (status, json)
}

fn id_of(value: &Value, field: &str) -> String { value[field].as_str().unwrap().to_owned() }

// ── Pages ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn page_crud_and_error_statuses() {
  let state = make_state().await;

  let (status, page) =
    call(&state, "POST", "/api/admin/pages", Some(json!({ "title": "Pricing Plans" }))).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(page["slug"], "pricing-plans");
  assert_eq!(page["status"], "draft");
  let id = id_of(&page, "page_id");

  let (status, detail) = call(&state, "GET", &format!("/api/admin/pages/{id}"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(detail["title"], "Pricing Plans");
  assert_eq!(detail["sections"], json!([]));

  let (status, body) =
    call(&state, "POST", "/api/admin/pages", Some(json!({ "title": "Pricing plans!" }))).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert!(body["error"].is_string());

  let (status, _) = call(
    &state,
    "PUT",
    &format!("/api/admin/pages/{id}"),
    Some(json!({ "title": "  " })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, copy) =
    call(&state, "POST", &format!("/api/admin/pages/{id}/duplicate"), None).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(copy["slug"], "pricing-plans-copy-2");

  let (status, _) = call(&state, "DELETE", &format!("/api/admin/pages/{id}"), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, _) = call(&state, "GET", &format!("/api/admin/pages/{id}"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  let missing = Uuid::new_v4();
  let (status, _) = call(&state, "DELETE", &format!("/api/admin/pages/{missing}"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Items ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn item_collections_are_typed_by_route() {
  let state = make_state().await;

  let (status, faq) = call(
    &state,
    "POST",
    "/api/admin/faqs",
    Some(json!({ "question": "Is there a free tier?", "answer": "Yes." })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(faq["kind"], "faq");
  assert_eq!(faq["value"]["answer"], "Yes.");
  let id = id_of(&faq, "item_id");

  let (status, copy) =
    call(&state, "POST", &format!("/api/admin/faqs/{id}/duplicate"), None).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(copy["value"]["question"], "Is there a free tier? (Copy 2)");

  let (status, list) = call(&state, "GET", "/api/admin/faqs?search=free", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(list.as_array().unwrap().len(), 2);

  // An FAQ is not reachable through another collection.
  let (status, _) = call(&state, "GET", &format!("/api/admin/testimonials/{id}"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, _) =
    call(&state, "POST", "/api/admin/faqs", Some(json!({ "answer": "orphan" }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, t) = call(
    &state,
    "POST",
    "/api/admin/testimonials",
    Some(json!({ "name": "Jo", "quote": "Great", "avatar_url": "acme.b-cdn.net/jo.png" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(t["value"]["avatar_url"], "https://acme.b-cdn.net/jo.png");
}

// ── Public site ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn public_page_applies_the_publication_hierarchy() {
  let state = make_state().await;

  let (_, page) = call(
    &state,
    "POST",
    "/api/admin/pages",
    Some(json!({ "title": "Home", "status": "published" })),
  )
  .await;
  let page_id = id_of(&page, "page_id");

  let (_, live) = call(
    &state,
    "POST",
    "/api/admin/sections",
    Some(json!({ "name": "Questions", "kind": "faq", "status": "published" })),
  )
  .await;
  let (_, hidden) = call(
    &state,
    "POST",
    "/api/admin/sections",
    Some(json!({ "name": "Coming soon", "kind": "custom" })),
  )
  .await;
  let live_id = id_of(&live, "section_id");
  let hidden_id = id_of(&hidden, "section_id");
  for section_id in [&live_id, &hidden_id] {
    let (status, _) = call(
      &state,
      "POST",
      &format!("/api/admin/pages/{page_id}/sections"),
      Some(json!({ "section_id": section_id, "status": "published" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
  }

  let (_, shown) = call(
    &state,
    "POST",
    "/api/admin/media",
    Some(json!({ "name": "Hero shot", "url": "/img/hero.png" })),
  )
  .await;
  let (_, drafted) = call(
    &state,
    "POST",
    "/api/admin/faqs",
    Some(json!({ "question": "Draft?", "answer": "Not yet." })),
  )
  .await;
  call(
    &state,
    "POST",
    &format!("/api/admin/sections/{live_id}/items"),
    Some(json!({ "item_id": id_of(&shown, "item_id"), "status": "published" })),
  )
  .await;
  call(
    &state,
    "POST",
    &format!("/api/admin/sections/{live_id}/items"),
    Some(json!({ "item_id": id_of(&drafted, "item_id") })),
  )
  .await;

  let (status, tree) = call(&state, "GET", "/api/site/pages/home", None).await;
  assert_eq!(status, StatusCode::OK);
  let sections = tree["sections"].as_array().unwrap();
  assert_eq!(sections.len(), 1);
  assert_eq!(sections[0]["name"], "Questions");
  let items = sections[0]["items"].as_array().unwrap();
  assert_eq!(items.len(), 1);
  assert_eq!(items[0]["value"]["url"], "https://cdn.example.com/img/hero.png");
  assert!(!state.cache.is_empty());

  // Demoting the link invalidates the cached tree.
  let (status, _) = call(
    &state,
    "PATCH",
    &format!("/api/admin/pages/{page_id}/sections/{live_id}"),
    Some(json!({ "status": "draft" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  let (_, tree) = call(&state, "GET", "/api/site/pages/home", None).await;
  assert_eq!(tree["sections"], json!([]));

  call(
    &state,
    "PUT",
    &format!("/api/admin/pages/{page_id}"),
    Some(json!({ "status": "deactivated" })),
  )
  .await;
  let (status, _) = call(&state, "GET", "/api/site/pages/home", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sitemap_lists_published_pages_only() {
  let state = make_state().await;
  call(
    &state,
    "POST",
    "/api/admin/pages",
    Some(json!({ "title": "About us", "status": "published" })),
  )
  .await;
  call(&state, "POST", "/api/admin/pages", Some(json!({ "title": "Secret" }))).await;

  let (status, content_type, body) = send(&state, "GET", "/sitemap.xml", vec![], None).await;
  assert_eq!(status, StatusCode::OK);
  assert!(content_type.unwrap().starts_with("application/xml"));
  let xml = String::from_utf8(body.to_vec()).unwrap();
  assert!(xml.contains("<loc>https://example.com/about-us</loc>"), "{xml}");
  assert!(!xml.contains("secret"));

  let (status, _, body) = send(&state, "GET", "/health", vec![], None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(&body[..], b"ok");
}

// ── Theme ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn theme_round_trips_and_refreshes_the_stylesheet() {
  let state = make_state().await;

  let (_, _, css) = send(&state, "GET", "/api/site/theme.css", vec![], None).await;
  assert!(String::from_utf8(css.to_vec()).unwrap().contains("--background: #ffffff;"));

  let (status, theme) = call(
    &state,
    "PUT",
    "/api/admin/theme",
    Some(json!({ "tokens": { "primary": { "h": 0, "s": 0, "l": 0 } } })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(theme["tokens"]["primary"]["hex"], "#000000");

  let (_, content_type, css) = send(&state, "GET", "/api/site/theme.css", vec![], None).await;
  assert!(content_type.unwrap().starts_with("text/css"));
  let css = String::from_utf8(css.to_vec()).unwrap();
  assert!(css.contains("--primary: #000000;"));
  assert!(!css.contains("--background"));

  let (status, _) = call(
    &state,
    "PUT",
    "/api/admin/theme",
    Some(json!({ "tokens": { "primary": { "h": 0, "s": 150, "l": 0 } } })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ── Analytics ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn analytics_from_dev_hosts_is_skipped() {
  let state = make_state().await;
  let event = json!({ "event_type": "click", "entity_type": "cta", "entity_id": "signup" });

  for host in ["localhost:3000", "staging.example.com"] {
    let (status, _, body) =
      send(&state, "POST", "/api/admin/analytics", vec![("host", host)], Some(event.clone()))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), json!({ "skipped": true }));
  }

  let (status, _, body) = send(
    &state,
    "POST",
    "/api/admin/analytics",
    vec![("host", "example.com"), ("cf-ipcountry", "DE"), ("x-vercel-ip-city", "Berlin")],
    Some(event),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  let stored: Value = serde_json::from_slice(&body).unwrap();
  assert_eq!(stored["country"], "DE");
  assert_eq!(stored["city"], "Berlin");

  let (_, events) = call(&state, "GET", "/api/admin/analytics?scope=7", None).await;
  assert_eq!(events.as_array().unwrap().len(), 1);
  let (status, _) = call(&state, "GET", "/api/admin/analytics/top?scope=all", None).await;
  assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn huge_analytics_scope_reads_everything() {
  let state = make_state().await;
  let event = json!({ "event_type": "page_view", "session_id": "s1" });
  let (status, _) = call(&state, "POST", "/api/admin/analytics", Some(event)).await;
  assert_eq!(status, StatusCode::CREATED);

  let (status, summary) =
    call(&state, "GET", "/api/admin/analytics/summary?scope=100000000", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(summary["total_events"], 1);
  let (status, events) = call(
    &state,
    "GET",
    "/api/admin/analytics?scope=100000000&limit=18446744073709551615",
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(events.as_array().unwrap().len(), 1);
  let (status, _) = call(&state, "GET", "/api/admin/analytics/top?scope=4294967295", None).await;
  assert_eq!(status, StatusCode::OK);
}

// ── Intel ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn document_removal_is_idempotent() {
  let state = make_state().await;
  let (_, kb) =
    call(&state, "POST", "/api/intel/knowledge-bases", Some(json!({ "name": "Research" }))).await;
  let kb_id = id_of(&kb, "kb_id");

  let (status, doc) = call(
    &state,
    "POST",
    "/api/intel/documents",
    Some(json!({
      "kb_id": kb_id,
      "title": "Pricing notes",
      "text": "Competitors charge monthly.\n\nOur pricing is yearly."
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  let doc_id = id_of(&doc, "document_id");

  let (_, chunks) = call(&state, "GET", &format!("/api/intel/documents/{doc_id}/chunks"), None).await;
  assert!(!chunks.as_array().unwrap().is_empty());

  for _ in 0..2 {
    let (status, _) = call(&state, "DELETE", &format!("/api/intel/documents/{doc_id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
  }

  let (_, chunks) = call(&state, "GET", &format!("/api/intel/documents/{doc_id}/chunks"), None).await;
  assert_eq!(chunks, json!([]));
  let (_, live) = call(&state, "GET", &format!("/api/intel/documents?kb_id={kb_id}"), None).await;
  assert_eq!(live, json!([]));
  let (_, all) = call(
    &state,
    "GET",
    &format!("/api/intel/documents?kb_id={kb_id}&include_deleted=true"),
    None,
  )
  .await;
  assert_eq!(all.as_array().unwrap().len(), 1);

  let (status, _) =
    call(&state, "DELETE", &format!("/api/intel/documents/{}", Uuid::new_v4()), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn report_callback_then_view_and_html() {
  let state = make_state().await;
  let (_, subject) = call(
    &state,
    "POST",
    "/api/intel/research-subjects",
    Some(json!({ "name": "Pet insurance", "category": "finance" })),
  )
  .await;
  let (_, workflow) = call(
    &state,
    "POST",
    "/api/intel/workflows",
    Some(json!({ "name": "Deep dive", "webhook_url": "http://127.0.0.1:9/hook" })),
  )
  .await;
  let subject_id = Uuid::parse_str(&id_of(&subject, "subject_id")).unwrap();
  let workflow_id = Uuid::parse_str(&id_of(&workflow, "workflow_id")).unwrap();

  let done = state.store.create_run(workflow_id, subject_id).await.unwrap();
  let failed = state.store.create_run(workflow_id, subject_id).await.unwrap();

  let (status, report) = call(
    &state,
    "POST",
    "/api/intel/reports",
    Some(json!({
      "run_id": done.run_id,
      "body": { "overview": { "title": "Pets & <Money>", "summary": "Growing." } }
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(report["subject_id"], json!(subject_id));

  let (status, run) = call(
    &state,
    "POST",
    "/api/intel/reports",
    Some(json!({ "run_id": failed.run_id, "error": "model quota exceeded" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(run["status"], "failed");

  let (status, _) = call(
    &state,
    "POST",
    "/api/intel/reports",
    Some(json!({ "run_id": Uuid::new_v4() })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (_, run) = call(&state, "GET", &format!("/api/intel/runs/{}", done.run_id), None).await;
  assert_eq!(run["status"], "completed");

  let (status, view) =
    call(&state, "GET", &format!("/api/intel/reports/{}/view", done.run_id), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(view["overview"]["title"], "Pets & <Money>");

  let (status, content_type, html) =
    send(&state, "GET", &format!("/api/intel/reports/{}/html", done.run_id), vec![], None).await;
  assert_eq!(status, StatusCode::OK);
  assert!(content_type.unwrap().starts_with("text/html"));
  let html = String::from_utf8(html.to_vec()).unwrap();
  assert!(html.contains("Pets &amp; &lt;Money&gt;"));

  let (_, list) =
    call(&state, "GET", &format!("/api/intel/reports?subject_id={subject_id}"), None).await;
  assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unreachable_workflow_webhook_is_a_bad_gateway() {
  let state = make_state().await;
  let (_, subject) =
    call(&state, "POST", "/api/intel/research-subjects", Some(json!({ "name": "Vegan snacks" })))
      .await;
  let (_, workflow) = call(
    &state,
    "POST",
    "/api/intel/workflows",
    Some(json!({ "name": "Scan", "webhook_url": "http://127.0.0.1:9/hook" })),
  )
  .await;
  let workflow_id = id_of(&workflow, "workflow_id");
  let run = json!({ "subject_id": id_of(&subject, "subject_id") });

  let (status, body) = call(
    &state,
    "POST",
    &format!("/api/intel/workflows/{workflow_id}/run"),
    Some(run.clone()),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_GATEWAY);
  assert!(body["error"].is_string());

  call(
    &state,
    "PUT",
    &format!("/api/intel/workflows/{workflow_id}"),
    Some(json!({ "active": false })),
  )
  .await;
  let (status, _) =
    call(&state, "POST", &format!("/api/intel/workflows/{workflow_id}/run"), Some(run)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ── Chat ─────────────────────────────────────────────────────────────────────

async fn new_conversation(state: &ApiState<SqliteStore>) -> String {
  let (status, conversation) =
    call(state, "POST", "/api/chat/conversations", Some(json!({ "title": "Questions" }))).await;
  assert_eq!(status, StatusCode::CREATED);
  id_of(&conversation, "conversation_id")
}

#[tokio::test]
async fn chat_reply_is_streamed_and_stored() {
  let state = make_state().await;
  let id = new_conversation(&state).await;

  let (status, content_type, body) = send(
    &state,
    "POST",
    &format!("/api/chat/conversations/{id}/messages"),
    vec![],
    Some(json!({ "content": "Say hello" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert!(content_type.unwrap().starts_with("text/event-stream"));
  let events = String::from_utf8(body.to_vec()).unwrap();
  assert!(events.contains("event: delta\ndata: {\"content\":\"Hel\"}"), "{events}");
  assert!(events.contains("event: done\n"), "{events}");
  assert!(!events.contains("event: error"));

  let (_, detail) = call(&state, "GET", &format!("/api/chat/conversations/{id}"), None).await;
  let messages = detail["messages"].as_array().unwrap();
  assert_eq!(messages.len(), 2);
  assert_eq!(messages[0]["role"], "user");
  assert_eq!(messages[1]["role"], "assistant");
  assert_eq!(messages[1]["content"], "Hello");
  assert_eq!(messages[1]["model"], "fake/model");
}

#[tokio::test]
async fn broken_reply_stream_stores_nothing() {
  let state =
    make_state_with(Arc::new(FakeGateway { deltas: vec!["Par"], breaks: true })).await;
  let id = new_conversation(&state).await;

  let (status, _, body) = send(
    &state,
    "POST",
    &format!("/api/chat/conversations/{id}/messages"),
    vec![],
    Some(json!({ "content": "Tell me more" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  let events = String::from_utf8(body.to_vec()).unwrap();
  assert!(events.contains("event: error"), "{events}");
  assert!(!events.contains("event: done"));

  let (_, detail) = call(&state, "GET", &format!("/api/chat/conversations/{id}"), None).await;
  assert_eq!(detail["messages"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn empty_reply_stream_is_an_error() {
  let state = make_state_with(Arc::new(FakeGateway { deltas: vec![], breaks: false })).await;
  let id = new_conversation(&state).await;

  let (status, _, body) = send(
    &state,
    "POST",
    &format!("/api/chat/conversations/{id}/messages"),
    vec![],
    Some(json!({ "content": "Anyone there?" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  let events = String::from_utf8(body.to_vec()).unwrap();
  assert!(events.contains("event: error"), "{events}");
  assert!(!events.contains("event: done"));

  let (_, detail) = call(&state, "GET", &format!("/api/chat/conversations/{id}"), None).await;
  let messages = detail["messages"].as_array().unwrap();
  assert_eq!(messages.len(), 1);
  assert_eq!(messages[0]["role"], "user");
}

#[tokio::test]
async fn chat_without_api_key_is_unavailable() {
  let gateway = OpenRouter::new(None, None).unwrap();
  let state = make_state_with(Arc::new(gateway)).await;
  let id = new_conversation(&state).await;

  let (status, body) = call(
    &state,
    "POST",
    &format!("/api/chat/conversations/{id}/messages"),
    Some(json!({ "content": "hello?" })),
  )
  .await;
  assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
  assert!(body["error"].is_string());

  let (status, _) = call(
    &state,
    "POST",
    &format!("/api/chat/conversations/{}/messages", Uuid::new_v4()),
    Some(json!({ "content": "anyone?" })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn context_preview_searches_the_selected_knowledge_base() {
  let state = make_state().await;
  let (_, kb) =
    call(&state, "POST", "/api/intel/knowledge-bases", Some(json!({ "name": "Market" }))).await;
  let kb_id = id_of(&kb, "kb_id");
  call(
    &state,
    "POST",
    "/api/intel/documents",
    Some(json!({ "kb_id": kb_id, "title": "Notes", "text": "Annual pricing wins." })),
  )
  .await;
  let id = new_conversation(&state).await;

  let (status, _) = call(
    &state,
    "PUT",
    &format!("/api/chat/conversations/{id}/context"),
    Some(json!({ "kb_id": Uuid::new_v4() })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, conversation) = call(
    &state,
    "PUT",
    &format!("/api/chat/conversations/{id}/context"),
    Some(json!({ "kb_id": kb_id })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(conversation["kb_id"], json!(kb_id));

  let (status, preview) = call(
    &state,
    "GET",
    &format!("/api/chat/conversations/{id}/context?q=What%20about%20pricing"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(preview["kb_id"], json!(kb_id));
  let chunks = preview["chunks"].as_array().unwrap();
  assert_eq!(chunks.len(), 1);
  assert_eq!(chunks[0]["text"], "Annual pricing wins.");
}
