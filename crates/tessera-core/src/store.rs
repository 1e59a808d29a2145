//! Store traits and supporting query types.
//!
//! Traits are implemented by storage backends (e.g. `tessera-store-sqlite`).
//! Higher layers (`tessera-api`, `tessera-server`) depend on these
//! abstractions, not on any concrete backend.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  analytics::{AnalyticsEvent, AnalyticsSummary, EntityCount, EventQuery, NewEvent},
  chat::{ChatContext, ChatMessage, ChatRole, Conversation, NewConversation},
  intel::{
    Chunk, ChunkQuery, Document, DocumentQuery, KnowledgeBase, KnowledgeBaseUpdate,
    NewDocument, NewKnowledgeBase, NewProject, NewProjectType, NewResearchSubject,
    NewWorkflow, Project, ProjectType, ProjectTypeUpdate, ProjectUpdate, Report,
    ReportSummary, ResearchSubject, ResearchSubjectUpdate, RunStatus, SubjectQuery,
    Workflow, WorkflowRun, WorkflowUpdate,
  },
  item::{Item, ItemKind, ItemValue},
  page::{NewPage, Page, PageSection, PageUpdate, SectionLinkInput},
  section::{NewSection, Section, SectionItem, SectionKind, SectionUpdate},
  session::Session,
  status::{LinkUpdate, PublishStatus},
};

// ─── Errors ──────────────────────────────────────────────────────────────────

/// A backend error that can say whether it stems from a missing row or a
/// uniqueness violation, so the HTTP layer can answer 404 or 409.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn is_not_found(&self) -> bool { false }
  fn is_conflict(&self) -> bool { false }
}

impl StoreError for std::convert::Infallible {}

/// Common supertrait fixing the error type shared by every store trait.
pub trait Backend: Send + Sync {
  type Error: StoreError;
}

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for [`ContentStore::list_pages`].
#[derive(Debug, Clone, Default)]
pub struct PageQuery {
  /// Case-insensitive substring of title or slug.
  pub search: Option<String>,
  pub status: Option<PublishStatus>,
}

/// Parameters for [`ContentStore::list_sections`].
#[derive(Debug, Clone, Default)]
pub struct SectionQuery {
  /// Case-insensitive substring of the name.
  pub search: Option<String>,
  pub kind:   Option<SectionKind>,
  pub status: Option<PublishStatus>,
}

// ─── Content ─────────────────────────────────────────────────────────────────

/// Pages, sections, content items, the junctions between them and settings.
///
/// Operations taking a container id (`attach_*`, `duplicate_*` with a target)
/// fail with a not-found error when the container or the attached row does
/// not exist. Lookups of a single row return `None` instead.
pub trait ContentStore: Backend {
  // ── Pages ─────────────────────────────────────────────────────────────

  /// A missing slug is derived from the title.
  fn create_page(
    &self,
    input: NewPage,
  ) -> impl Future<Output = Result<Page, Self::Error>> + Send + '_;

  fn get_page(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Page>, Self::Error>> + Send + '_;

  fn get_page_by_slug(
    &self,
    slug: String,
  ) -> impl Future<Output = Result<Option<Page>, Self::Error>> + Send + '_;

  fn list_pages(
    &self,
    query: PageQuery,
  ) -> impl Future<Output = Result<Vec<Page>, Self::Error>> + Send + '_;

  fn update_page(
    &self,
    id: Uuid,
    update: PageUpdate,
  ) -> impl Future<Output = Result<Option<Page>, Self::Error>> + Send + '_;

  /// Deletes the page and its section links; the sections survive.
  fn delete_page(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Clone a page under a copy-suffixed title and slug, together with its
  /// section links. The clone starts as a draft.
  fn duplicate_page(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Page>, Self::Error>> + Send + '_;

  // ── Page ↔ section links ──────────────────────────────────────────────

  /// Links ordered by position.
  fn page_sections(
    &self,
    page_id: Uuid,
  ) -> impl Future<Output = Result<Vec<PageSection>, Self::Error>> + Send + '_;

  /// Link a section at the end of the page.
  fn attach_section(
    &self,
    page_id: Uuid,
    section_id: Uuid,
    status: PublishStatus,
  ) -> impl Future<Output = Result<PageSection, Self::Error>> + Send + '_;

  fn update_page_section(
    &self,
    page_id: Uuid,
    section_id: Uuid,
    update: LinkUpdate,
  ) -> impl Future<Output = Result<Option<PageSection>, Self::Error>> + Send + '_;

  fn detach_section(
    &self,
    page_id: Uuid,
    section_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Replace every link of the page atomically; list order becomes position.
  fn replace_page_sections(
    &self,
    page_id: Uuid,
    links: Vec<SectionLinkInput>,
  ) -> impl Future<Output = Result<Vec<PageSection>, Self::Error>> + Send + '_;

  // ── Sections ──────────────────────────────────────────────────────────

  fn create_section(
    &self,
    input: NewSection,
  ) -> impl Future<Output = Result<Section, Self::Error>> + Send + '_;

  fn get_section(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Section>, Self::Error>> + Send + '_;

  fn list_sections(
    &self,
    query: SectionQuery,
  ) -> impl Future<Output = Result<Vec<Section>, Self::Error>> + Send + '_;

  fn update_section(
    &self,
    id: Uuid,
    update: SectionUpdate,
  ) -> impl Future<Output = Result<Option<Section>, Self::Error>> + Send + '_;

  /// Deletes the section and every link to or from it.
  fn delete_section(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Clone a section under a version-suffixed name, together with its item
  /// links, and optionally append the clone to `page_id`. All of it happens
  /// in one transaction.
  fn duplicate_section(
    &self,
    id: Uuid,
    page_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Option<Section>, Self::Error>> + Send + '_;

  // ── Section ↔ item links ──────────────────────────────────────────────

  fn section_items(
    &self,
    section_id: Uuid,
  ) -> impl Future<Output = Result<Vec<SectionItem>, Self::Error>> + Send + '_;

  /// Link an item at the end of the section.
  fn attach_item(
    &self,
    section_id: Uuid,
    item_id: Uuid,
    status: PublishStatus,
  ) -> impl Future<Output = Result<SectionItem, Self::Error>> + Send + '_;

  fn update_section_item(
    &self,
    section_id: Uuid,
    item_id: Uuid,
    update: LinkUpdate,
  ) -> impl Future<Output = Result<Option<SectionItem>, Self::Error>> + Send + '_;

  fn detach_item(
    &self,
    section_id: Uuid,
    item_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Items ─────────────────────────────────────────────────────────────

  fn create_item(
    &self,
    value: ItemValue,
  ) -> impl Future<Output = Result<Item, Self::Error>> + Send + '_;

  /// `None` when the item does not exist or is of another kind.
  fn get_item(
    &self,
    kind: ItemKind,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Item>, Self::Error>> + Send + '_;

  /// `search` is a case-insensitive substring of the label.
  fn list_items(
    &self,
    kind: ItemKind,
    search: Option<String>,
  ) -> impl Future<Output = Result<Vec<Item>, Self::Error>> + Send + '_;

  /// Replace an item's value. The kind of `value` must match the stored kind.
  fn update_item(
    &self,
    id: Uuid,
    value: ItemValue,
  ) -> impl Future<Output = Result<Option<Item>, Self::Error>> + Send + '_;

  fn delete_item(
    &self,
    kind: ItemKind,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Clone an item under a copy-suffixed label and optionally append the
  /// clone to `section_id`, in one transaction.
  fn duplicate_item(
    &self,
    kind: ItemKind,
    id: Uuid,
    section_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Option<Item>, Self::Error>> + Send + '_;

  // ── Settings ──────────────────────────────────────────────────────────

  fn get_setting(
    &self,
    key: String,
  ) -> impl Future<Output = Result<Option<serde_json::Value>, Self::Error>> + Send + '_;

  fn put_setting(
    &self,
    key: String,
    value: serde_json::Value,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

// ─── Analytics ───────────────────────────────────────────────────────────────

/// The append-only analytics ledger. Aggregation happens in the backend.
pub trait AnalyticsStore: Backend {
  /// `created_at` is set by the store.
  fn record_event(
    &self,
    input: NewEvent,
  ) -> impl Future<Output = Result<AnalyticsEvent, Self::Error>> + Send + '_;

  /// Newest first.
  fn list_events(
    &self,
    query: EventQuery,
  ) -> impl Future<Output = Result<Vec<AnalyticsEvent>, Self::Error>> + Send + '_;

  fn summarize(
    &self,
    since: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<AnalyticsSummary, Self::Error>> + Send + '_;

  /// Most frequent `(entity_type, entity_id)` pairs, events without an
  /// entity excluded.
  fn top_entities(
    &self,
    since: Option<DateTime<Utc>>,
    event_type: Option<String>,
    entity_type: Option<String>,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<EntityCount>, Self::Error>> + Send + '_;
}

// ─── Intel ───────────────────────────────────────────────────────────────────

/// Knowledge bases, documents, projects, workflows, research subjects, runs
/// and reports.
pub trait IntelStore: Backend {
  // ── Knowledge bases ───────────────────────────────────────────────────

  fn create_knowledge_base(
    &self,
    input: NewKnowledgeBase,
  ) -> impl Future<Output = Result<KnowledgeBase, Self::Error>> + Send + '_;

  fn get_knowledge_base(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<KnowledgeBase>, Self::Error>> + Send + '_;

  fn list_knowledge_bases(
    &self,
  ) -> impl Future<Output = Result<Vec<KnowledgeBase>, Self::Error>> + Send + '_;

  fn update_knowledge_base(
    &self,
    id: Uuid,
    update: KnowledgeBaseUpdate,
  ) -> impl Future<Output = Result<Option<KnowledgeBase>, Self::Error>> + Send + '_;

  /// Hard delete; documents and chunks cascade.
  fn delete_knowledge_base(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Documents ─────────────────────────────────────────────────────────

  /// Insert the document and its chunks. Fails with not-found when the
  /// knowledge base does not exist.
  fn create_document(
    &self,
    input: NewDocument,
    chunks: Vec<String>,
  ) -> impl Future<Output = Result<Document, Self::Error>> + Send + '_;

  /// Returns soft-deleted documents too.
  fn get_document(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send + '_;

  fn list_documents(
    &self,
    query: DocumentQuery,
  ) -> impl Future<Output = Result<Vec<Document>, Self::Error>> + Send + '_;

  /// Set `deleted_at` if it is not set yet. Returns `true` when this call
  /// performed the delete, `false` when the document was already deleted or
  /// does not exist.
  fn soft_delete_document(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Delete the chunks of a document; returns how many were removed.
  fn purge_chunks(
    &self,
    document_id: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  fn document_chunks(
    &self,
    document_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Chunk>, Self::Error>> + Send + '_;

  /// Chunks of live documents matching the query, best match first.
  fn search_chunks(
    &self,
    query: ChunkQuery,
  ) -> impl Future<Output = Result<Vec<Chunk>, Self::Error>> + Send + '_;

  /// Idempotent. Fails with not-found when either side does not exist.
  fn link_document(
    &self,
    document_id: Uuid,
    project_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn unlink_document(
    &self,
    document_id: Uuid,
    project_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Projects ──────────────────────────────────────────────────────────

  fn create_project(
    &self,
    input: NewProject,
  ) -> impl Future<Output = Result<Project, Self::Error>> + Send + '_;

  fn get_project(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Project>, Self::Error>> + Send + '_;

  fn list_projects(
    &self,
  ) -> impl Future<Output = Result<Vec<Project>, Self::Error>> + Send + '_;

  fn update_project(
    &self,
    id: Uuid,
    update: ProjectUpdate,
  ) -> impl Future<Output = Result<Option<Project>, Self::Error>> + Send + '_;

  fn delete_project(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Project types ─────────────────────────────────────────────────────

  /// A missing slug is derived from the name.
  fn create_project_type(
    &self,
    input: NewProjectType,
  ) -> impl Future<Output = Result<ProjectType, Self::Error>> + Send + '_;

  fn list_project_types(
    &self,
  ) -> impl Future<Output = Result<Vec<ProjectType>, Self::Error>> + Send + '_;

  fn update_project_type(
    &self,
    id: Uuid,
    update: ProjectTypeUpdate,
  ) -> impl Future<Output = Result<Option<ProjectType>, Self::Error>> + Send + '_;

  fn delete_project_type(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Workflows ─────────────────────────────────────────────────────────

  fn create_workflow(
    &self,
    input: NewWorkflow,
  ) -> impl Future<Output = Result<Workflow, Self::Error>> + Send + '_;

  fn get_workflow(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Workflow>, Self::Error>> + Send + '_;

  fn list_workflows(
    &self,
    project_type_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<Workflow>, Self::Error>> + Send + '_;

  fn update_workflow(
    &self,
    id: Uuid,
    update: WorkflowUpdate,
  ) -> impl Future<Output = Result<Option<Workflow>, Self::Error>> + Send + '_;

  fn delete_workflow(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Research subjects ─────────────────────────────────────────────────

  fn create_subject(
    &self,
    input: NewResearchSubject,
  ) -> impl Future<Output = Result<ResearchSubject, Self::Error>> + Send + '_;

  fn get_subject(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<ResearchSubject>, Self::Error>> + Send + '_;

  fn list_subjects(
    &self,
    query: SubjectQuery,
  ) -> impl Future<Output = Result<Vec<ResearchSubject>, Self::Error>> + Send + '_;

  fn update_subject(
    &self,
    id: Uuid,
    update: ResearchSubjectUpdate,
  ) -> impl Future<Output = Result<Option<ResearchSubject>, Self::Error>> + Send + '_;

  fn delete_subject(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Clone a subject under a copy-suffixed name.
  fn duplicate_subject(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<ResearchSubject>, Self::Error>> + Send + '_;

  // ── Runs and reports ──────────────────────────────────────────────────

  /// Record a pending run. Fails with not-found when the workflow or the
  /// subject does not exist.
  fn create_run(
    &self,
    workflow_id: Uuid,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<WorkflowRun, Self::Error>> + Send + '_;

  fn get_run(
    &self,
    run_id: Uuid,
  ) -> impl Future<Output = Result<Option<WorkflowRun>, Self::Error>> + Send + '_;

  fn finish_run(
    &self,
    run_id: Uuid,
    status: RunStatus,
    error: Option<String>,
  ) -> impl Future<Output = Result<Option<WorkflowRun>, Self::Error>> + Send + '_;

  /// Store (or replace) the report of a run and mark the run completed.
  /// Fails with not-found when the run does not exist.
  fn save_report(
    &self,
    run_id: Uuid,
    body: serde_json::Value,
  ) -> impl Future<Output = Result<Report, Self::Error>> + Send + '_;

  fn get_report(
    &self,
    run_id: Uuid,
  ) -> impl Future<Output = Result<Option<Report>, Self::Error>> + Send + '_;

  /// Newest first.
  fn list_reports(
    &self,
    subject_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<ReportSummary>, Self::Error>> + Send + '_;
}

// ─── Chat ────────────────────────────────────────────────────────────────────

pub trait ChatStore: Backend {
  fn create_conversation(
    &self,
    input: NewConversation,
  ) -> impl Future<Output = Result<Conversation, Self::Error>> + Send + '_;

  fn get_conversation(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Conversation>, Self::Error>> + Send + '_;

  /// Most recently updated first.
  fn list_conversations(
    &self,
  ) -> impl Future<Output = Result<Vec<Conversation>, Self::Error>> + Send + '_;

  /// Deletes the conversation and its messages.
  fn delete_conversation(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn set_context(
    &self,
    id: Uuid,
    context: ChatContext,
  ) -> impl Future<Output = Result<Option<Conversation>, Self::Error>> + Send + '_;

  /// Append a message and bump the conversation's `updated_at`. Fails with
  /// not-found when the conversation does not exist.
  fn append_message(
    &self,
    conversation_id: Uuid,
    role: ChatRole,
    content: String,
    model: Option<String>,
  ) -> impl Future<Output = Result<ChatMessage, Self::Error>> + Send + '_;

  /// Oldest first.
  fn messages(
    &self,
    conversation_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ChatMessage>, Self::Error>> + Send + '_;
}

// ─── Sessions ────────────────────────────────────────────────────────────────

pub trait SessionStore: Backend {
  fn create_session(
    &self,
    session: Session,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Returns the session even when expired; callers check expiry.
  fn find_session(
    &self,
    token_hash: String,
  ) -> impl Future<Output = Result<Option<Session>, Self::Error>> + Send + '_;

  fn delete_session(
    &self,
    token_hash: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn purge_expired_sessions(
    &self,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}

// ─── Aggregate ───────────────────────────────────────────────────────────────

/// Everything the HTTP layer needs from a backend.
pub trait SiteStore:
  ContentStore + AnalyticsStore + IntelStore + ChatStore + SessionStore
{
}

impl<T> SiteStore for T where
  T: ContentStore + AnalyticsStore + IntelStore + ChatStore + SessionStore
{
}
