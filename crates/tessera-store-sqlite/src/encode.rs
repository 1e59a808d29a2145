//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are fixed-width RFC 3339 UTC strings (microsecond precision,
//! `Z` suffix) so that lexical order is chronological order and the first ten
//! characters are the UTC calendar day. JSON payloads are stored compact.
//! UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;
use tessera_core::{
  analytics::AnalyticsEvent,
  chat::{ChatMessage, ChatRole, Conversation},
  intel::{
    Chunk, Document, KnowledgeBase, Project, ProjectType, Report, ReportSummary,
    ResearchSubject, RunStatus, Workflow, WorkflowRun,
  },
  item::{Item, ItemValue},
  page::Page,
  section::{Section, SectionKind},
  session::Session,
  status::PublishStatus,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// A row count for `LIMIT`/`OFFSET`; counts past `i64::MAX` saturate.
pub fn encode_count(n: usize) -> i64 { i64::try_from(n).unwrap_or(i64::MAX) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

pub fn decode_status(s: &str) -> Result<PublishStatus> {
  s.parse()
    .map_err(|_| tessera_core::Error::UnknownStatus(s.to_owned()).into())
}

fn decode_json(s: &str) -> Result<serde_json::Value> { Ok(serde_json::from_str(s)?) }

/// `%term%` for a case-insensitive `LIKE`, with the wildcards in `term`
/// escaped (pair with `ESCAPE '\'`).
pub fn like_pattern(term: &str) -> String {
  let mut out = String::with_capacity(term.len() + 2);
  out.push('%');
  for c in term.chars() {
    if matches!(c, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(c);
  }
  out.push('%');
  out
}

// ─── Pages ───────────────────────────────────────────────────────────────────

pub const PAGE_COLS: &str =
  "p.page_id, p.title, p.slug, p.description, p.status, p.created_at, p.updated_at";

pub struct RawPage {
  pub page_id:     String,
  pub title:       String,
  pub slug:        String,
  pub description: Option<String>,
  pub status:      String,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawPage {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      page_id:     row.get(0)?,
      title:       row.get(1)?,
      slug:        row.get(2)?,
      description: row.get(3)?,
      status:      row.get(4)?,
      created_at:  row.get(5)?,
      updated_at:  row.get(6)?,
    })
  }

  pub fn into_page(self) -> Result<Page> {
    Ok(Page {
      page_id:     decode_uuid(&self.page_id)?,
      title:       self.title,
      slug:        self.slug,
      description: self.description,
      status:      decode_status(&self.status)?,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

// ─── Sections ────────────────────────────────────────────────────────────────

pub const SECTION_COLS: &str = "s.section_id, s.name, s.kind, s.content_json, \
                                s.status, s.created_at, s.updated_at";

pub struct RawSection {
  pub section_id:   String,
  pub name:         String,
  pub kind:         String,
  pub content_json: String,
  pub status:       String,
  pub created_at:   String,
  pub updated_at:   String,
}

impl RawSection {
  /// Reads the seven [`SECTION_COLS`] starting at column `at`.
  pub fn from_row_at(row: &Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      section_id:   row.get(at)?,
      name:         row.get(at + 1)?,
      kind:         row.get(at + 2)?,
      content_json: row.get(at + 3)?,
      status:       row.get(at + 4)?,
      created_at:   row.get(at + 5)?,
      updated_at:   row.get(at + 6)?,
    })
  }

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> { Self::from_row_at(row, 0) }

  pub fn into_section(self) -> Result<Section> {
    let kind = self
      .kind
      .parse::<SectionKind>()
      .map_err(|_| tessera_core::Error::UnknownSectionKind(self.kind.clone()))?;
    Ok(Section {
      section_id: decode_uuid(&self.section_id)?,
      name: self.name,
      kind,
      content: decode_json(&self.content_json)?,
      status: decode_status(&self.status)?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

// ─── Items ───────────────────────────────────────────────────────────────────

pub const ITEM_COLS: &str = "i.item_id, i.kind, i.value_json, i.created_at, i.updated_at";

pub struct RawItem {
  pub item_id:    String,
  pub kind:       String,
  pub value_json: String,
  pub created_at: String,
  pub updated_at: String,
}

impl RawItem {
  /// Reads the five [`ITEM_COLS`] starting at column `at`.
  pub fn from_row_at(row: &Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      item_id:    row.get(at)?,
      kind:       row.get(at + 1)?,
      value_json: row.get(at + 2)?,
      created_at: row.get(at + 3)?,
      updated_at: row.get(at + 4)?,
    })
  }

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> { Self::from_row_at(row, 0) }

  pub fn into_item(self) -> Result<Item> {
    let value = ItemValue::from_stored(&self.kind, decode_json(&self.value_json)?)?;
    Ok(Item {
      item_id: decode_uuid(&self.item_id)?,
      value,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// A junction row (`page_sections` or `section_items`): container id,
/// position and status, followed by the linked row.
pub struct RawLink<T> {
  pub container_id: String,
  pub position:     i64,
  pub status:       String,
  pub target:       T,
}

impl<T> RawLink<T> {
  pub fn from_row(
    row: &Row<'_>,
    target: impl FnOnce(&Row<'_>, usize) -> rusqlite::Result<T>,
  ) -> rusqlite::Result<Self> {
    Ok(Self {
      container_id: row.get(0)?,
      position:     row.get(1)?,
      status:       row.get(2)?,
      target:       target(row, 3)?,
    })
  }

  pub fn decode_head(&self) -> Result<(Uuid, i64, PublishStatus)> {
    Ok((
      decode_uuid(&self.container_id)?,
      self.position,
      decode_status(&self.status)?,
    ))
  }
}

// ─── Analytics ───────────────────────────────────────────────────────────────

pub const EVENT_COLS: &str = "event_id, event_type, entity_type, entity_id, session_id, \
                              page_path, country, city, metadata_json, created_at";

pub struct RawEvent {
  pub event_id:      String,
  pub event_type:    String,
  pub entity_type:   Option<String>,
  pub entity_id:     Option<String>,
  pub session_id:    Option<String>,
  pub page_path:     Option<String>,
  pub country:       Option<String>,
  pub city:          Option<String>,
  pub metadata_json: String,
  pub created_at:    String,
}

impl RawEvent {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:      row.get(0)?,
      event_type:    row.get(1)?,
      entity_type:   row.get(2)?,
      entity_id:     row.get(3)?,
      session_id:    row.get(4)?,
      page_path:     row.get(5)?,
      country:       row.get(6)?,
      city:          row.get(7)?,
      metadata_json: row.get(8)?,
      created_at:    row.get(9)?,
    })
  }

  pub fn into_event(self) -> Result<AnalyticsEvent> {
    Ok(AnalyticsEvent {
      event_id:    decode_uuid(&self.event_id)?,
      event_type:  self.event_type,
      entity_type: self.entity_type,
      entity_id:   self.entity_id,
      session_id:  self.session_id,
      page_path:   self.page_path,
      country:     self.country,
      city:        self.city,
      metadata:    decode_json(&self.metadata_json)?,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

// ─── Intel ───────────────────────────────────────────────────────────────────

pub const KB_COLS: &str = "kb_id, name, description, created_at, updated_at";

pub struct RawKnowledgeBase {
  pub kb_id:       String,
  pub name:        String,
  pub description: Option<String>,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawKnowledgeBase {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      kb_id:       row.get(0)?,
      name:        row.get(1)?,
      description: row.get(2)?,
      created_at:  row.get(3)?,
      updated_at:  row.get(4)?,
    })
  }

  pub fn into_knowledge_base(self) -> Result<KnowledgeBase> {
    Ok(KnowledgeBase {
      kb_id:       decode_uuid(&self.kb_id)?,
      name:        self.name,
      description: self.description,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

/// Document columns plus a live chunk count.
pub const DOCUMENT_COLS: &str = "d.document_id, d.kb_id, d.title, d.source_url, d.mime_type, \
   (SELECT COUNT(*) FROM chunks c WHERE c.document_id = d.document_id), \
   d.created_at, d.deleted_at";

pub struct RawDocument {
  pub document_id: String,
  pub kb_id:       String,
  pub title:       String,
  pub source_url:  Option<String>,
  pub mime_type:   Option<String>,
  pub chunk_count: i64,
  pub created_at:  String,
  pub deleted_at:  Option<String>,
}

impl RawDocument {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      document_id: row.get(0)?,
      kb_id:       row.get(1)?,
      title:       row.get(2)?,
      source_url:  row.get(3)?,
      mime_type:   row.get(4)?,
      chunk_count: row.get(5)?,
      created_at:  row.get(6)?,
      deleted_at:  row.get(7)?,
    })
  }

  pub fn into_document(self) -> Result<Document> {
    Ok(Document {
      document_id: decode_uuid(&self.document_id)?,
      kb_id:       decode_uuid(&self.kb_id)?,
      title:       self.title,
      source_url:  self.source_url,
      mime_type:   self.mime_type,
      chunk_count: u64::try_from(self.chunk_count).unwrap_or_default(),
      created_at:  decode_dt(&self.created_at)?,
      deleted_at:  decode_opt_dt(self.deleted_at)?,
    })
  }
}

pub struct RawChunk {
  pub chunk_id:    String,
  pub document_id: String,
  pub ordinal:     u32,
  pub text:        String,
}

impl RawChunk {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      chunk_id:    row.get(0)?,
      document_id: row.get(1)?,
      ordinal:     row.get(2)?,
      text:        row.get(3)?,
    })
  }

  pub fn into_chunk(self) -> Result<Chunk> {
    Ok(Chunk {
      chunk_id:    decode_uuid(&self.chunk_id)?,
      document_id: decode_uuid(&self.document_id)?,
      ordinal:     self.ordinal,
      text:        self.text,
    })
  }
}

pub const PROJECT_COLS: &str =
  "project_id, name, description, project_type_id, created_at, updated_at";

pub struct RawProject {
  pub project_id:      String,
  pub name:            String,
  pub description:     Option<String>,
  pub project_type_id: Option<String>,
  pub created_at:      String,
  pub updated_at:      String,
}

impl RawProject {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      project_id:      row.get(0)?,
      name:            row.get(1)?,
      description:     row.get(2)?,
      project_type_id: row.get(3)?,
      created_at:      row.get(4)?,
      updated_at:      row.get(5)?,
    })
  }

  pub fn into_project(self) -> Result<Project> {
    Ok(Project {
      project_id:      decode_uuid(&self.project_id)?,
      name:            self.name,
      description:     self.description,
      project_type_id: decode_opt_uuid(self.project_type_id)?,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

pub const PROJECT_TYPE_COLS: &str = "project_type_id, name, slug, created_at";

pub struct RawProjectType {
  pub project_type_id: String,
  pub name:            String,
  pub slug:            String,
  pub created_at:      String,
}

impl RawProjectType {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      project_type_id: row.get(0)?,
      name:            row.get(1)?,
      slug:            row.get(2)?,
      created_at:      row.get(3)?,
    })
  }

  pub fn into_project_type(self) -> Result<ProjectType> {
    Ok(ProjectType {
      project_type_id: decode_uuid(&self.project_type_id)?,
      name:            self.name,
      slug:            self.slug,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}

pub const WORKFLOW_COLS: &str = "workflow_id, name, description, webhook_url, \
                                 project_type_id, active, created_at, updated_at";

pub struct RawWorkflow {
  pub workflow_id:     String,
  pub name:            String,
  pub description:     Option<String>,
  pub webhook_url:     String,
  pub project_type_id: Option<String>,
  pub active:          bool,
  pub created_at:      String,
  pub updated_at:      String,
}

impl RawWorkflow {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      workflow_id:     row.get(0)?,
      name:            row.get(1)?,
      description:     row.get(2)?,
      webhook_url:     row.get(3)?,
      project_type_id: row.get(4)?,
      active:          row.get(5)?,
      created_at:      row.get(6)?,
      updated_at:      row.get(7)?,
    })
  }

  pub fn into_workflow(self) -> Result<Workflow> {
    Ok(Workflow {
      workflow_id:     decode_uuid(&self.workflow_id)?,
      name:            self.name,
      description:     self.description,
      webhook_url:     self.webhook_url,
      project_type_id: decode_opt_uuid(self.project_type_id)?,
      active:          self.active,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

pub const SUBJECT_COLS: &str = "subject_id, name, category, description, \
                                project_type_id, created_at, updated_at";

pub struct RawSubject {
  pub subject_id:      String,
  pub name:            String,
  pub category:        Option<String>,
  pub description:     Option<String>,
  pub project_type_id: Option<String>,
  pub created_at:      String,
  pub updated_at:      String,
}

impl RawSubject {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      subject_id:      row.get(0)?,
      name:            row.get(1)?,
      category:        row.get(2)?,
      description:     row.get(3)?,
      project_type_id: row.get(4)?,
      created_at:      row.get(5)?,
      updated_at:      row.get(6)?,
    })
  }

  pub fn into_subject(self) -> Result<ResearchSubject> {
    Ok(ResearchSubject {
      subject_id:      decode_uuid(&self.subject_id)?,
      name:            self.name,
      category:        self.category,
      description:     self.description,
      project_type_id: decode_opt_uuid(self.project_type_id)?,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

pub const RUN_COLS: &str =
  "run_id, workflow_id, subject_id, status, error, created_at, finished_at";

pub struct RawRun {
  pub run_id:      String,
  pub workflow_id: String,
  pub subject_id:  String,
  pub status:      String,
  pub error:       Option<String>,
  pub created_at:  String,
  pub finished_at: Option<String>,
}

impl RawRun {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      run_id:      row.get(0)?,
      workflow_id: row.get(1)?,
      subject_id:  row.get(2)?,
      status:      row.get(3)?,
      error:       row.get(4)?,
      created_at:  row.get(5)?,
      finished_at: row.get(6)?,
    })
  }

  pub fn into_run(self) -> Result<WorkflowRun> {
    let status = self
      .status
      .parse::<RunStatus>()
      .map_err(|_| tessera_core::Error::UnknownStatus(self.status.clone()))?;
    Ok(WorkflowRun {
      run_id: decode_uuid(&self.run_id)?,
      workflow_id: decode_uuid(&self.workflow_id)?,
      subject_id: decode_uuid(&self.subject_id)?,
      status,
      error: self.error,
      created_at: decode_dt(&self.created_at)?,
      finished_at: decode_opt_dt(self.finished_at)?,
    })
  }
}

pub struct RawReport {
  pub run_id:     String,
  pub subject_id: String,
  pub body_json:  String,
  pub created_at: String,
}

impl RawReport {
  pub fn into_report(self) -> Result<Report> {
    Ok(Report {
      run_id:     decode_uuid(&self.run_id)?,
      subject_id: decode_uuid(&self.subject_id)?,
      body:       decode_json(&self.body_json)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawReportSummary {
  pub run_id:       String,
  pub subject_id:   String,
  pub subject_name: String,
  pub workflow_id:  String,
  pub created_at:   String,
}

impl RawReportSummary {
  pub fn into_summary(self) -> Result<ReportSummary> {
    Ok(ReportSummary {
      run_id:       decode_uuid(&self.run_id)?,
      subject_id:   decode_uuid(&self.subject_id)?,
      subject_name: self.subject_name,
      workflow_id:  decode_uuid(&self.workflow_id)?,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

// ─── Chat ────────────────────────────────────────────────────────────────────

pub const CONVERSATION_COLS: &str =
  "conversation_id, title, kb_id, project_id, created_at, updated_at";

pub struct RawConversation {
  pub conversation_id: String,
  pub title:           String,
  pub kb_id:           Option<String>,
  pub project_id:      Option<String>,
  pub created_at:      String,
  pub updated_at:      String,
}

impl RawConversation {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      conversation_id: row.get(0)?,
      title:           row.get(1)?,
      kb_id:           row.get(2)?,
      project_id:      row.get(3)?,
      created_at:      row.get(4)?,
      updated_at:      row.get(5)?,
    })
  }

  pub fn into_conversation(self) -> Result<Conversation> {
    Ok(Conversation {
      conversation_id: decode_uuid(&self.conversation_id)?,
      title:           self.title,
      kb_id:           decode_opt_uuid(self.kb_id)?,
      project_id:      decode_opt_uuid(self.project_id)?,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

pub struct RawMessage {
  pub message_id:      String,
  pub conversation_id: String,
  pub role:            String,
  pub content:         String,
  pub model:           Option<String>,
  pub created_at:      String,
}

impl RawMessage {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      message_id:      row.get(0)?,
      conversation_id: row.get(1)?,
      role:            row.get(2)?,
      content:         row.get(3)?,
      model:           row.get(4)?,
      created_at:      row.get(5)?,
    })
  }

  pub fn into_message(self) -> Result<ChatMessage> {
    let role = self
      .role
      .parse::<ChatRole>()
      .map_err(|_| Error::Decode(format!("unknown chat role: {:?}", self.role)))?;
    Ok(ChatMessage {
      message_id: decode_uuid(&self.message_id)?,
      conversation_id: decode_uuid(&self.conversation_id)?,
      role,
      content: self.content,
      model: self.model,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

// ─── Sessions ────────────────────────────────────────────────────────────────

pub struct RawSession {
  pub token_hash: String,
  pub username:   String,
  pub created_at: String,
  pub expires_at: String,
}

impl RawSession {
  pub fn into_session(self) -> Result<Session> {
    Ok(Session {
      token_hash: self.token_hash,
      username:   self.username,
      created_at: decode_dt(&self.created_at)?,
      expires_at: decode_dt(&self.expires_at)?,
    })
  }
}
