//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, Utc};
use serde_json::json;
use tessera_core::{
  analytics::{EventQuery, NewEvent},
  chat::{ChatContext, ChatRole, NewConversation},
  intel::{
    chunk_text, ChunkQuery, DocumentQuery, NewDocument, NewKnowledgeBase, NewProject,
    NewProjectType, NewResearchSubject, NewWorkflow, RunStatus, SubjectQuery,
  },
  item::{CtaValue, FaqValue, ItemKind, ItemValue},
  page::{NewPage, PageUpdate, SectionLinkInput},
  section::{NewSection, SectionKind},
  session::Session,
  status::{LinkUpdate, PublishStatus},
  store::{
    AnalyticsStore, ChatStore, ContentStore, IntelStore, PageQuery, SectionQuery,
    SessionStore, StoreError,
  },
};
use uuid::Uuid;

use crate::{encode::encode_dt, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn new_page(title: &str) -> NewPage {
  NewPage {
    title:       title.to_owned(),
    slug:        None,
    description: None,
    status:      PublishStatus::Draft,
  }
}

fn new_section(name: &str) -> NewSection {
  NewSection {
    name:    name.to_owned(),
    kind:    SectionKind::Hero,
    content: json!({ "headline": "Ship faster" }),
    status:  PublishStatus::Published,
  }
}

fn faq(question: &str) -> ItemValue {
  ItemValue::Faq(FaqValue {
    question: question.to_owned(),
    answer:   "Yes.".to_owned(),
  })
}

// ─── Pages ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_page_derives_slug() {
  let s = store().await;
  let page = s.create_page(new_page("Pricing & Plans")).await.unwrap();
  assert_eq!(page.slug, "pricing-plans");

  let fetched = s.get_page_by_slug("pricing-plans".into()).await.unwrap().unwrap();
  assert_eq!(fetched.page_id, page.page_id);
  assert_eq!(fetched.status, PublishStatus::Draft);
}

#[tokio::test]
async fn duplicate_slug_is_a_conflict() {
  let s = store().await;
  s.create_page(new_page("About")).await.unwrap();
  let err = s.create_page(new_page("About")).await.unwrap_err();
  assert!(err.is_conflict());
  assert!(!err.is_not_found());
}

#[tokio::test]
async fn update_page_keeps_unset_fields() {
  let s = store().await;
  let page = s.create_page(new_page("Home")).await.unwrap();

  let updated = s
    .update_page(page.page_id, PageUpdate {
      status: Some(PublishStatus::Published),
      ..Default::default()
    })
    .await
    .unwrap()
    .unwrap();
  assert_eq!(updated.title, "Home");
  assert_eq!(updated.slug, "home");
  assert!(updated.status.is_published());

  let missing = s.update_page(Uuid::new_v4(), PageUpdate::default()).await.unwrap();
  assert!(missing.is_none());
}

#[tokio::test]
async fn list_pages_filters() {
  let s = store().await;
  s.create_page(new_page("Home")).await.unwrap();
  s.create_page(NewPage { status: PublishStatus::Published, ..new_page("Pricing") })
    .await
    .unwrap();

  let published = s
    .list_pages(PageQuery { status: Some(PublishStatus::Published), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(published.len(), 1);
  assert_eq!(published[0].title, "Pricing");

  let searched = s
    .list_pages(PageQuery { search: Some("HOM".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(searched.len(), 1);
  assert_eq!(searched[0].title, "Home");
}

#[tokio::test]
async fn duplicate_page_copies_links_under_new_names() {
  let s = store().await;
  let page = s.create_page(new_page("Landing")).await.unwrap();
  let hero = s.create_section(new_section("Hero")).await.unwrap();
  s.attach_section(page.page_id, hero.section_id, PublishStatus::Published)
    .await
    .unwrap();

  let first = s.duplicate_page(page.page_id).await.unwrap().unwrap();
  assert_eq!(first.title, "Landing (Copy 2)");
  assert_eq!(first.slug, "landing-copy-2");
  assert_eq!(first.status, PublishStatus::Draft);

  let second = s.duplicate_page(first.page_id).await.unwrap().unwrap();
  assert_eq!(second.title, "Landing (Copy 3)");
  assert_eq!(second.slug, "landing-copy-3");

  let links = s.page_sections(second.page_id).await.unwrap();
  assert_eq!(links.len(), 1);
  assert_eq!(links[0].section.section_id, hero.section_id);
  assert_eq!(links[0].status, PublishStatus::Published);

  assert!(s.duplicate_page(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn deleting_a_page_keeps_its_sections() {
  let s = store().await;
  let page = s.create_page(new_page("Temp")).await.unwrap();
  let section = s.create_section(new_section("Hero")).await.unwrap();
  s.attach_section(page.page_id, section.section_id, PublishStatus::Draft)
    .await
    .unwrap();

  assert!(s.delete_page(page.page_id).await.unwrap());
  assert!(!s.delete_page(page.page_id).await.unwrap());
  assert!(s.get_section(section.section_id).await.unwrap().is_some());
  assert!(s.page_sections(page.page_id).await.unwrap().is_empty());
}

// ─── Page ↔ section links ────────────────────────────────────────────────────

#[tokio::test]
async fn attach_appends_at_next_position() {
  let s = store().await;
  let page = s.create_page(new_page("Home")).await.unwrap();
  let a = s.create_section(new_section("A")).await.unwrap();
  let b = s.create_section(new_section("B")).await.unwrap();

  let first = s.attach_section(page.page_id, a.section_id, PublishStatus::Draft).await.unwrap();
  let second = s.attach_section(page.page_id, b.section_id, PublishStatus::Draft).await.unwrap();
  assert_eq!(first.position, 0);
  assert_eq!(second.position, 1);

  let again = s
    .attach_section(page.page_id, a.section_id, PublishStatus::Draft)
    .await
    .unwrap_err();
  assert!(again.is_conflict());
}

#[tokio::test]
async fn attach_to_missing_page_is_not_found() {
  let s = store().await;
  let section = s.create_section(new_section("Hero")).await.unwrap();
  let err = s
    .attach_section(Uuid::new_v4(), section.section_id, PublishStatus::Draft)
    .await
    .unwrap_err();
  assert!(err.is_not_found());
}

#[tokio::test]
async fn update_and_detach_link() {
  let s = store().await;
  let page = s.create_page(new_page("Home")).await.unwrap();
  let section = s.create_section(new_section("Hero")).await.unwrap();
  s.attach_section(page.page_id, section.section_id, PublishStatus::Draft)
    .await
    .unwrap();

  let link = s
    .update_page_section(page.page_id, section.section_id, LinkUpdate {
      position: Some(5),
      status:   Some(PublishStatus::Deactivated),
    })
    .await
    .unwrap()
    .unwrap();
  assert_eq!(link.position, 5);
  assert_eq!(link.status, PublishStatus::Deactivated);

  assert!(s.detach_section(page.page_id, section.section_id).await.unwrap());
  assert!(!s.detach_section(page.page_id, section.section_id).await.unwrap());
}

#[tokio::test]
async fn replace_page_sections_reorders() {
  let s = store().await;
  let page = s.create_page(new_page("Home")).await.unwrap();
  let a = s.create_section(new_section("A")).await.unwrap();
  let b = s.create_section(new_section("B")).await.unwrap();
  let c = s.create_section(new_section("C")).await.unwrap();
  s.attach_section(page.page_id, a.section_id, PublishStatus::Draft).await.unwrap();
  s.attach_section(page.page_id, b.section_id, PublishStatus::Draft).await.unwrap();

  let links = s
    .replace_page_sections(page.page_id, vec![
      SectionLinkInput { section_id: c.section_id, status: PublishStatus::Published },
      SectionLinkInput { section_id: a.section_id, status: PublishStatus::Draft },
    ])
    .await
    .unwrap();

  let order: Vec<_> = links.iter().map(|l| (l.section.name.as_str(), l.position)).collect();
  assert_eq!(order, vec![("C", 0), ("A", 1)]);

  let err = s
    .replace_page_sections(page.page_id, vec![SectionLinkInput {
      section_id: Uuid::new_v4(),
      status:     PublishStatus::Draft,
    }])
    .await
    .unwrap_err();
  assert!(err.is_not_found());
  // The failed replacement rolled back.
  assert_eq!(s.page_sections(page.page_id).await.unwrap().len(), 2);
}

// ─── Sections ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_sections_by_kind() {
  let s = store().await;
  s.create_section(new_section("Hero")).await.unwrap();
  s.create_section(NewSection { kind: SectionKind::Faq, ..new_section("Questions") })
    .await
    .unwrap();

  let faqs = s
    .list_sections(SectionQuery { kind: Some(SectionKind::Faq), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(faqs.len(), 1);
  assert_eq!(faqs[0].name, "Questions");
}

#[tokio::test]
async fn duplicate_section_versions_and_attaches() {
  let s = store().await;
  let page = s.create_page(new_page("Home")).await.unwrap();
  let hero = s.create_section(new_section("Hero")).await.unwrap();
  let item = s.create_item(faq("Is it fast?")).await.unwrap();
  s.attach_item(hero.section_id, item.item_id, PublishStatus::Published)
    .await
    .unwrap();
  s.attach_section(page.page_id, hero.section_id, PublishStatus::Published)
    .await
    .unwrap();

  let v2 = s
    .duplicate_section(hero.section_id, Some(page.page_id))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(v2.name, "Hero V2");
  assert_eq!(v2.content, hero.content);

  // Duplicating the copy continues the lineage.
  let v3 = s.duplicate_section(v2.section_id, None).await.unwrap().unwrap();
  assert_eq!(v3.name, "Hero V3");

  let links = s.page_sections(page.page_id).await.unwrap();
  assert_eq!(links.len(), 2);
  assert_eq!(links[1].section.section_id, v2.section_id);
  assert_eq!(links[1].position, 1);

  let cloned_items = s.section_items(v2.section_id).await.unwrap();
  assert_eq!(cloned_items.len(), 1);
  assert_eq!(cloned_items[0].item.item_id, item.item_id);
}

#[tokio::test]
async fn duplicate_section_into_missing_page_inserts_nothing() {
  let s = store().await;
  let hero = s.create_section(new_section("Hero")).await.unwrap();

  let err = s
    .duplicate_section(hero.section_id, Some(Uuid::new_v4()))
    .await
    .unwrap_err();
  assert!(err.is_not_found());

  let all = s.list_sections(SectionQuery::default()).await.unwrap();
  assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn deleting_a_section_removes_its_links() {
  let s = store().await;
  let page = s.create_page(new_page("Home")).await.unwrap();
  let hero = s.create_section(new_section("Hero")).await.unwrap();
  let item = s.create_item(faq("Why?")).await.unwrap();
  s.attach_section(page.page_id, hero.section_id, PublishStatus::Draft).await.unwrap();
  s.attach_item(hero.section_id, item.item_id, PublishStatus::Draft).await.unwrap();

  assert!(s.delete_section(hero.section_id).await.unwrap());
  assert!(s.page_sections(page.page_id).await.unwrap().is_empty());
  assert!(s.get_item(ItemKind::Faq, item.item_id).await.unwrap().is_some());
}

// ─── Items ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn items_are_scoped_by_kind() {
  let s = store().await;
  let item = s.create_item(faq("What is it?")).await.unwrap();

  assert!(s.get_item(ItemKind::Faq, item.item_id).await.unwrap().is_some());
  assert!(s.get_item(ItemKind::Cta, item.item_id).await.unwrap().is_none());
  assert!(!s.delete_item(ItemKind::Cta, item.item_id).await.unwrap());
  assert_eq!(s.list_items(ItemKind::Faq, None).await.unwrap().len(), 1);
  assert!(s.list_items(ItemKind::Cta, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn update_item_rejects_kind_change() {
  let s = store().await;
  let item = s.create_item(faq("What is it?")).await.unwrap();

  let updated = s
    .update_item(item.item_id, faq("What is it, really?"))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(updated.value.label(), "What is it, really?");

  let cta = ItemValue::Cta(CtaValue {
    label:   "Buy".into(),
    url:     "/buy".into(),
    variant: None,
    new_tab: false,
  });
  assert!(s.update_item(item.item_id, cta).await.is_err());
  assert!(s.update_item(Uuid::new_v4(), faq("x")).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_item_counter_strictly_increases() {
  let s = store().await;
  let section = s.create_section(new_section("FAQ")).await.unwrap();
  let item = s.create_item(faq("What is it?")).await.unwrap();

  let c2 = s
    .duplicate_item(ItemKind::Faq, item.item_id, Some(section.section_id))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(c2.value.label(), "What is it? (Copy 2)");

  let c3 = s.duplicate_item(ItemKind::Faq, item.item_id, None).await.unwrap().unwrap();
  assert_eq!(c3.value.label(), "What is it? (Copy 3)");

  // Removing an earlier copy never lets a later duplicate reuse a counter
  // below the highest one.
  assert!(s.delete_item(ItemKind::Faq, c2.item_id).await.unwrap());
  let c4 = s.duplicate_item(ItemKind::Faq, c3.item_id, None).await.unwrap().unwrap();
  assert_eq!(c4.value.label(), "What is it? (Copy 4)");

  let links = s.section_items(section.section_id).await.unwrap();
  assert!(links.is_empty(), "deleted copy takes its link with it");
}

#[tokio::test]
async fn duplicate_item_into_missing_section_is_not_found() {
  let s = store().await;
  let item = s.create_item(faq("Q")).await.unwrap();
  let err = s
    .duplicate_item(ItemKind::Faq, item.item_id, Some(Uuid::new_v4()))
    .await
    .unwrap_err();
  assert!(err.is_not_found());
  assert_eq!(s.list_items(ItemKind::Faq, None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn item_label_is_unique_per_kind() {
  let s = store().await;
  s.create_item(faq("Same")).await.unwrap();
  let err = s.create_item(faq("Same")).await.unwrap_err();
  assert!(err.is_conflict());
}

// ─── Settings ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn settings_upsert() {
  let s = store().await;
  assert!(s.get_setting("theme".into()).await.unwrap().is_none());
  s.put_setting("theme".into(), json!({ "a": 1 })).await.unwrap();
  s.put_setting("theme".into(), json!({ "a": 2 })).await.unwrap();
  assert_eq!(s.get_setting("theme".into()).await.unwrap(), Some(json!({ "a": 2 })));
}

// ─── Analytics ───────────────────────────────────────────────────────────────

fn event(event_type: &str, session: &str, country: Option<&str>) -> NewEvent {
  NewEvent {
    event_type:  event_type.to_owned(),
    entity_type: Some("cta".into()),
    entity_id:   Some("buy-now".into()),
    session_id:  Some(session.to_owned()),
    page_path:   Some("/".into()),
    country:     country.map(str::to_owned),
    city:        None,
    metadata:    serde_json::Value::Null,
  }
}

/// Insert an event with an explicit timestamp, bypassing `record_event`.
async fn backdated_event(s: &SqliteStore, days_ago: i64) {
  let at = encode_dt(Utc::now() - Duration::days(days_ago));
  let id = Uuid::new_v4().to_string();
  s.conn
    .call(move |conn| {
      conn.execute(
        "INSERT INTO analytics_events (event_id, event_type, session_id, created_at)
         VALUES (?1, 'page_view', 'old', ?2)",
        [id, at],
      )?;
      Ok(())
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn summary_groups_by_day_and_country() {
  let s = store().await;
  s.record_event(event("cta_click", "s1", Some("DE"))).await.unwrap();
  s.record_event(event("cta_click", "s1", Some("DE"))).await.unwrap();
  s.record_event(event("page_view", "s2", None)).await.unwrap();

  let summary = s.summarize(None).await.unwrap();
  assert_eq!(summary.total_events, 3);
  assert_eq!(summary.unique_sessions, 2);
  assert_eq!(summary.by_day.len(), 1, "same UTC day collapses to one point");
  assert_eq!(summary.by_day[0].count, 3);
  assert_eq!(summary.by_country[0].key.as_deref(), Some("DE"));
  assert_eq!(summary.by_country[0].count, 2);
  assert_eq!(summary.by_event_type[0].key.as_deref(), Some("cta_click"));
}

#[tokio::test]
async fn summary_scope_excludes_older_events() {
  let s = store().await;
  s.record_event(event("page_view", "s1", None)).await.unwrap();
  backdated_event(&s, 10).await;
  backdated_event(&s, 3).await;

  let week = s.summarize(Some(Utc::now() - Duration::days(7))).await.unwrap();
  assert_eq!(week.total_events, 2);

  let all = s.summarize(None).await.unwrap();
  assert_eq!(all.total_events, 3);
  assert_eq!(all.by_day.len(), 3);
  assert!(all.by_day.windows(2).all(|w| w[0].day < w[1].day));
}

#[tokio::test]
async fn list_events_paginates_newest_first() {
  let s = store().await;
  for i in 0..5 {
    s.record_event(event("page_view", &format!("s{i}"), None)).await.unwrap();
  }
  let page = s
    .list_events(EventQuery { limit: Some(2), offset: Some(1), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(page.len(), 2);
  assert_eq!(page[0].session_id.as_deref(), Some("s3"));
  assert_eq!(page[1].session_id.as_deref(), Some("s2"));
}

#[tokio::test]
async fn oversized_limits_saturate_instead_of_wrapping() {
  let s = store().await;
  for i in 0..3 {
    s.record_event(event("page_view", &format!("s{i}"), None)).await.unwrap();
  }
  let all = s
    .list_events(EventQuery { limit: Some(usize::MAX), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(all.len(), 3);

  let past_the_end = s
    .list_events(EventQuery { limit: Some(usize::MAX), offset: Some(usize::MAX), ..Default::default() })
    .await
    .unwrap();
  assert!(past_the_end.is_empty());

  let top = s.top_entities(None, None, None, usize::MAX).await.unwrap();
  assert_eq!(top[0].count, 3);
}

#[tokio::test]
async fn top_entities_counts_pairs() {
  let s = store().await;
  s.record_event(event("cta_click", "s1", None)).await.unwrap();
  s.record_event(event("cta_click", "s2", None)).await.unwrap();
  s.record_event(NewEvent { entity_id: Some("signup".into()), ..event("cta_click", "s3", None) })
    .await
    .unwrap();
  s.record_event(NewEvent { entity_id: None, ..event("page_view", "s4", None) })
    .await
    .unwrap();

  let top = s
    .top_entities(None, Some("cta_click".into()), None, 10)
    .await
    .unwrap();
  assert_eq!(top.len(), 2);
  assert_eq!(top[0].entity_id.as_deref(), Some("buy-now"));
  assert_eq!(top[0].count, 2);
}

// ─── Intel ───────────────────────────────────────────────────────────────────

async fn kb(s: &SqliteStore) -> Uuid {
  s.create_knowledge_base(NewKnowledgeBase { name: "Market".into(), description: None })
    .await
    .unwrap()
    .kb_id
}

fn doc(kb_id: Uuid, title: &str, text: &str) -> NewDocument {
  NewDocument {
    kb_id,
    title: title.to_owned(),
    source_url: None,
    mime_type: Some("text/plain".into()),
    text: text.to_owned(),
  }
}

#[tokio::test]
async fn create_document_stores_chunks() {
  let s = store().await;
  let kb_id = kb(&s).await;
  let input = doc(kb_id, "Notes", "First paragraph.\n\nSecond paragraph.");
  let chunks = chunk_text(&input.text, 20);

  let document = s.create_document(input, chunks).await.unwrap();
  assert_eq!(document.chunk_count, 2);

  let stored = s.document_chunks(document.document_id).await.unwrap();
  assert_eq!(stored[0].ordinal, 0);
  assert_eq!(stored[1].text, "Second paragraph.");
}

#[tokio::test]
async fn create_document_in_missing_kb_is_not_found() {
  let s = store().await;
  let err = s
    .create_document(doc(Uuid::new_v4(), "x", "y"), vec!["y".into()])
    .await
    .unwrap_err();
  assert!(err.is_not_found());
}

#[tokio::test]
async fn soft_delete_is_idempotent() {
  let s = store().await;
  let kb_id = kb(&s).await;
  let document = s
    .create_document(doc(kb_id, "Notes", "text"), vec!["text".into()])
    .await
    .unwrap();

  assert!(s.soft_delete_document(document.document_id).await.unwrap());
  assert!(!s.soft_delete_document(document.document_id).await.unwrap());
  assert_eq!(s.purge_chunks(document.document_id).await.unwrap(), 1);
  assert_eq!(s.purge_chunks(document.document_id).await.unwrap(), 0);

  let fetched = s.get_document(document.document_id).await.unwrap().unwrap();
  assert!(fetched.is_deleted());

  let live = s.list_documents(DocumentQuery::default()).await.unwrap();
  assert!(live.is_empty());
  let all = s
    .list_documents(DocumentQuery { include_deleted: true, ..Default::default() })
    .await
    .unwrap();
  assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn search_chunks_ranks_by_matched_terms() {
  let s = store().await;
  let kb_id = kb(&s).await;
  s.create_document(doc(kb_id, "A", ""), vec![
    "pricing for saas tools".into(),
    "unrelated text".into(),
    "saas churn benchmarks".into(),
  ])
  .await
  .unwrap();

  let hits = s
    .search_chunks(ChunkQuery {
      kb_id: Some(kb_id),
      terms: vec!["saas".into(), "pricing".into()],
      limit: 6,
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(hits.len(), 2);
  assert_eq!(hits[0].text, "pricing for saas tools");
}

#[tokio::test]
async fn project_links_scope_documents() {
  let s = store().await;
  let kb_id = kb(&s).await;
  let project = s
    .create_project(NewProject { name: "Launch".into(), description: None, project_type_id: None })
    .await
    .unwrap();
  let linked = s.create_document(doc(kb_id, "In", "a"), vec!["alpha".into()]).await.unwrap();
  s.create_document(doc(kb_id, "Out", "b"), vec!["alpha".into()]).await.unwrap();

  s.link_document(linked.document_id, project.project_id).await.unwrap();
  // Linking twice is harmless.
  s.link_document(linked.document_id, project.project_id).await.unwrap();

  let docs = s
    .list_documents(DocumentQuery { project_id: Some(project.project_id), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(docs.len(), 1);
  assert_eq!(docs[0].title, "In");

  let hits = s
    .search_chunks(ChunkQuery {
      project_id: Some(project.project_id),
      terms: vec!["alpha".into()],
      limit: 6,
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(hits.len(), 1);

  let err = s.link_document(Uuid::new_v4(), project.project_id).await.unwrap_err();
  assert!(err.is_not_found());
  assert!(s.unlink_document(linked.document_id, project.project_id).await.unwrap());
}

#[tokio::test]
async fn deleting_a_kb_cascades() {
  let s = store().await;
  let kb_id = kb(&s).await;
  let document = s.create_document(doc(kb_id, "A", "a"), vec!["a".into()]).await.unwrap();
  assert!(s.delete_knowledge_base(kb_id).await.unwrap());
  assert!(s.get_document(document.document_id).await.unwrap().is_none());
}

#[tokio::test]
async fn project_type_slug_and_workflow_filter() {
  let s = store().await;
  let niche = s
    .create_project_type(NewProjectType { name: "Niche Report".into(), slug: None })
    .await
    .unwrap();
  assert_eq!(niche.slug, "niche-report");

  s.create_workflow(NewWorkflow {
    name:            "Generate".into(),
    description:     None,
    webhook_url:     "https://hooks.example/generate".into(),
    project_type_id: Some(niche.project_type_id),
    active:          true,
  })
  .await
  .unwrap();
  s.create_workflow(NewWorkflow {
    name:            "Other".into(),
    description:     None,
    webhook_url:     "https://hooks.example/other".into(),
    project_type_id: None,
    active:          false,
  })
  .await
  .unwrap();

  let scoped = s.list_workflows(Some(niche.project_type_id)).await.unwrap();
  assert_eq!(scoped.len(), 1);
  assert_eq!(scoped[0].name, "Generate");
  assert_eq!(s.list_workflows(None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn subjects_search_and_duplicate() {
  let s = store().await;
  let subject = s
    .create_subject(NewResearchSubject {
      name:            "Pet insurance".into(),
      category:        Some("finance".into()),
      description:     None,
      project_type_id: None,
    })
    .await
    .unwrap();

  let copy = s.duplicate_subject(subject.subject_id).await.unwrap().unwrap();
  assert_eq!(copy.name, "Pet insurance (Copy 2)");
  assert_eq!(copy.category.as_deref(), Some("finance"));

  let found = s
    .list_subjects(SubjectQuery { search: Some("insur".into()), category: None })
    .await
    .unwrap();
  assert_eq!(found.len(), 2);

  let none = s
    .list_subjects(SubjectQuery { search: None, category: Some("travel".into()) })
    .await
    .unwrap();
  assert!(none.is_empty());
}

#[tokio::test]
async fn report_callback_completes_run() {
  let s = store().await;
  let subject = s
    .create_subject(NewResearchSubject {
      name:            "Pet insurance".into(),
      category:        None,
      description:     None,
      project_type_id: None,
    })
    .await
    .unwrap();
  let workflow = s
    .create_workflow(NewWorkflow {
      name:            "Generate".into(),
      description:     None,
      webhook_url:     "https://hooks.example/generate".into(),
      project_type_id: None,
      active:          true,
    })
    .await
    .unwrap();

  let run = s.create_run(workflow.workflow_id, subject.subject_id).await.unwrap();
  assert_eq!(run.status, RunStatus::Pending);

  let report = s.save_report(run.run_id, json!({ "overview": {} })).await.unwrap();
  assert_eq!(report.subject_id, subject.subject_id);

  let finished = s.get_run(run.run_id).await.unwrap().unwrap();
  assert_eq!(finished.status, RunStatus::Completed);
  assert!(finished.finished_at.is_some());

  let listed = s.list_reports(Some(subject.subject_id)).await.unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].subject_name, "Pet insurance");

  let err = s.save_report(Uuid::new_v4(), json!({})).await.unwrap_err();
  assert!(err.is_not_found());
  let err = s.create_run(Uuid::new_v4(), subject.subject_id).await.unwrap_err();
  assert!(err.is_not_found());
}

#[tokio::test]
async fn failed_run_records_error() {
  let s = store().await;
  let subject = s
    .create_subject(NewResearchSubject {
      name:            "Drones".into(),
      category:        None,
      description:     None,
      project_type_id: None,
    })
    .await
    .unwrap();
  let workflow = s
    .create_workflow(NewWorkflow {
      name:            "Generate".into(),
      description:     None,
      webhook_url:     "https://hooks.example/generate".into(),
      project_type_id: None,
      active:          true,
    })
    .await
    .unwrap();
  let run = s.create_run(workflow.workflow_id, subject.subject_id).await.unwrap();

  let failed = s
    .finish_run(run.run_id, RunStatus::Failed, Some("webhook returned 500".into()))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(failed.status, RunStatus::Failed);
  assert_eq!(failed.error.as_deref(), Some("webhook returned 500"));
}

// ─── Chat ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn messages_keep_append_order() {
  let s = store().await;
  let conversation = s
    .create_conversation(NewConversation { title: None, kb_id: None, project_id: None })
    .await
    .unwrap();
  assert_eq!(conversation.title, "New conversation");

  s.append_message(conversation.conversation_id, ChatRole::User, "hi".into(), None)
    .await
    .unwrap();
  s.append_message(
    conversation.conversation_id,
    ChatRole::Assistant,
    "hello".into(),
    Some("test-model".into()),
  )
  .await
  .unwrap();

  let messages = s.messages(conversation.conversation_id).await.unwrap();
  let roles: Vec<_> = messages.iter().map(|m| m.role).collect();
  assert_eq!(roles, vec![ChatRole::User, ChatRole::Assistant]);
  assert_eq!(messages[1].model.as_deref(), Some("test-model"));

  let err = s
    .append_message(Uuid::new_v4(), ChatRole::User, "x".into(), None)
    .await
    .unwrap_err();
  assert!(err.is_not_found());
}

#[tokio::test]
async fn context_replaces_both_fields() {
  let s = store().await;
  let kb_id = kb(&s).await;
  let conversation = s
    .create_conversation(NewConversation { title: Some("Research".into()), kb_id: None, project_id: None })
    .await
    .unwrap();

  let updated = s
    .set_context(conversation.conversation_id, ChatContext { kb_id: Some(kb_id), project_id: None })
    .await
    .unwrap()
    .unwrap();
  assert_eq!(updated.kb_id, Some(kb_id));

  let cleared = s
    .set_context(conversation.conversation_id, ChatContext::default())
    .await
    .unwrap()
    .unwrap();
  assert!(cleared.kb_id.is_none());

  assert!(s.delete_conversation(conversation.conversation_id).await.unwrap());
  assert!(s.messages(conversation.conversation_id).await.unwrap().is_empty());
}

// ─── Sessions ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn sessions_expire_and_purge() {
  let s = store().await;
  let now = Utc::now();
  s.create_session(Session {
    token_hash: "live".into(),
    username:   "admin".into(),
    created_at: now,
    expires_at: now + Duration::hours(1),
  })
  .await
  .unwrap();
  s.create_session(Session {
    token_hash: "stale".into(),
    username:   "admin".into(),
    created_at: now - Duration::hours(2),
    expires_at: now - Duration::hours(1),
  })
  .await
  .unwrap();

  let stale = s.find_session("stale".into()).await.unwrap().unwrap();
  assert!(stale.is_expired(now));

  assert_eq!(s.purge_expired_sessions(now).await.unwrap(), 1);
  assert!(s.find_session("stale".into()).await.unwrap().is_none());
  assert!(s.delete_session("live".into()).await.unwrap());
}
