//! The RAG intelligence domain: knowledge bases, documents and their chunks,
//! projects, and the report-generation workflows run for research subjects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use uuid::Uuid;

// ─── Knowledge bases ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBase {
  pub kb_id:       Uuid,
  pub name:        String,
  pub description: Option<String>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewKnowledgeBase {
  pub name:        String,
  pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KnowledgeBaseUpdate {
  pub name:        Option<String>,
  pub description: Option<String>,
}

// ─── Documents ───────────────────────────────────────────────────────────────

/// A source document. Removal is a soft delete: `deleted_at` is set and the
/// chunks are purged, but the row stays for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
  pub document_id: Uuid,
  pub kb_id:       Uuid,
  pub title:       String,
  pub source_url:  Option<String>,
  pub mime_type:   Option<String>,
  pub chunk_count: u64,
  pub created_at:  DateTime<Utc>,
  pub deleted_at:  Option<DateTime<Utc>>,
}

impl Document {
  pub fn is_deleted(&self) -> bool { self.deleted_at.is_some() }
}

/// Input to [`crate::store::IntelStore::create_document`]. The text itself
/// is not stored on the document; it is split into chunks.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDocument {
  pub kb_id:      Uuid,
  pub title:      String,
  pub source_url: Option<String>,
  pub mime_type:  Option<String>,
  pub text:       String,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentQuery {
  pub kb_id:           Option<Uuid>,
  pub project_id:      Option<Uuid>,
  pub include_deleted: bool,
}

/// A contiguous piece of a document's text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
  pub chunk_id:    Uuid,
  pub document_id: Uuid,
  /// Zero-based position within the document.
  pub ordinal:     u32,
  pub text:        String,
}

/// Parameters for [`crate::store::IntelStore::search_chunks`].
#[derive(Debug, Clone, Default)]
pub struct ChunkQuery {
  pub kb_id:      Option<Uuid>,
  pub project_id: Option<Uuid>,
  /// Chunks matching more of these terms rank higher. When any are given, a
  /// chunk must match at least one; with none, the newest documents come
  /// first.
  pub terms:      Vec<String>,
  pub limit:      usize,
}

/// Upper bound on chunk length, in characters.
pub const MAX_CHUNK_CHARS: usize = 1200;

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Paragraphs (separated by blank lines) are packed greedily; a paragraph
/// longer than `max_chars` is split at the last whitespace before the limit,
/// or hard-split when it has none.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
  let max_chars = max_chars.max(1);
  let mut chunks = Vec::new();
  let mut current = String::new();

  let paragraphs = text
    .split("\n\n")
    .map(str::trim)
    .filter(|p| !p.is_empty());

  for paragraph in paragraphs {
    for piece in split_long(paragraph, max_chars) {
      let needed = if current.is_empty() { 0 } else { 2 } + piece.chars().count();
      if !current.is_empty() && current.chars().count() + needed > max_chars {
        chunks.push(std::mem::take(&mut current));
      }
      if !current.is_empty() {
        current.push_str("\n\n");
      }
      current.push_str(piece);
    }
  }

  if !current.is_empty() {
    chunks.push(current);
  }
  chunks
}

fn split_long(paragraph: &str, max_chars: usize) -> Vec<&str> {
  let mut pieces = Vec::new();
  let mut rest = paragraph;
  while rest.chars().count() > max_chars {
    let limit = rest
      .char_indices()
      .nth(max_chars)
      .map_or(rest.len(), |(i, _)| i);
    let cut = rest[..limit]
      .rfind(char::is_whitespace)
      .filter(|&i| i > 0)
      .unwrap_or(limit);
    pieces.push(rest[..cut].trim_end());
    rest = rest[cut..].trim_start();
  }
  if !rest.is_empty() {
    pieces.push(rest);
  }
  pieces
}

// ─── Projects ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
  pub project_id:      Uuid,
  pub name:            String,
  pub description:     Option<String>,
  pub project_type_id: Option<Uuid>,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProject {
  pub name:            String,
  pub description:     Option<String>,
  pub project_type_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectUpdate {
  pub name:            Option<String>,
  pub description:     Option<String>,
  pub project_type_id: Option<Uuid>,
}

/// A category of research (e.g. "niche report") that workflows target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectType {
  pub project_type_id: Uuid,
  pub name:            String,
  pub slug:            String,
  pub created_at:      DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProjectType {
  pub name: String,
  pub slug: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectTypeUpdate {
  pub name: Option<String>,
  pub slug: Option<String>,
}

// ─── Workflows ───────────────────────────────────────────────────────────────

/// An external automation that generates a report when its webhook is
/// called.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
  pub workflow_id:     Uuid,
  pub name:            String,
  pub description:     Option<String>,
  pub webhook_url:     String,
  pub project_type_id: Option<Uuid>,
  pub active:          bool,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewWorkflow {
  pub name:            String,
  pub description:     Option<String>,
  pub webhook_url:     String,
  pub project_type_id: Option<Uuid>,
  #[serde(default = "yes")]
  pub active:          bool,
}

fn yes() -> bool { true }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkflowUpdate {
  pub name:            Option<String>,
  pub description:     Option<String>,
  pub webhook_url:     Option<String>,
  pub project_type_id: Option<Uuid>,
  pub active:          Option<bool>,
}

/// Something a report is generated about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchSubject {
  pub subject_id:      Uuid,
  /// Unique across subjects.
  pub name:            String,
  pub category:        Option<String>,
  pub description:     Option<String>,
  pub project_type_id: Option<Uuid>,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewResearchSubject {
  pub name:            String,
  pub category:        Option<String>,
  pub description:     Option<String>,
  pub project_type_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResearchSubjectUpdate {
  pub name:            Option<String>,
  pub category:        Option<String>,
  pub description:     Option<String>,
  pub project_type_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct SubjectQuery {
  pub search:   Option<String>,
  pub category: Option<String>,
}

// ─── Runs and reports ────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RunStatus {
  Pending,
  Completed,
  Failed,
}

impl RunStatus {
  pub fn as_str(self) -> &'static str { self.into() }
}

/// One invocation of a workflow for a subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
  pub run_id:      Uuid,
  pub workflow_id: Uuid,
  pub subject_id:  Uuid,
  pub status:      RunStatus,
  pub error:       Option<String>,
  pub created_at:  DateTime<Utc>,
  pub finished_at: Option<DateTime<Utc>>,
}

/// The opaque JSON document a workflow posts back for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
  pub run_id:     Uuid,
  pub subject_id: Uuid,
  pub body:       serde_json::Value,
  pub created_at: DateTime<Utc>,
}

/// Listing form of a report, without the body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
  pub run_id:       Uuid,
  pub subject_id:   Uuid,
  pub subject_name: String,
  pub workflow_id:  Uuid,
  pub created_at:   DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn short_paragraphs_are_packed_together() {
    let chunks = chunk_text("one\n\ntwo\n\n\n\nthree", 100);
    assert_eq!(chunks, vec!["one\n\ntwo\n\nthree"]);
  }

  #[test]
  fn packing_respects_the_limit() {
    let chunks = chunk_text("aaaa\n\nbbbb\n\ncccc", 10);
    assert_eq!(chunks, vec!["aaaa\n\nbbbb", "cccc"]);
    assert!(chunks.iter().all(|c| c.chars().count() <= 10));
  }

  #[test]
  fn long_paragraph_splits_on_whitespace() {
    let chunks = chunk_text("alpha beta gamma delta", 11);
    assert_eq!(chunks, vec!["alpha beta", "gamma delta"]);
  }

  #[test]
  fn unbroken_text_is_hard_split_on_char_boundaries() {
    let chunks = chunk_text("ééééééé", 3);
    assert_eq!(chunks, vec!["ééé", "ééé", "é"]);
  }

  #[test]
  fn blank_text_has_no_chunks() {
    assert!(chunk_text("  \n\n \n\n", 50).is_empty());
  }
}
