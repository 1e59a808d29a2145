//! [`IntelStore`] for [`SqliteStore`].

use chrono::Utc;
use rusqlite::{types::Value, Connection, OptionalExtension as _};
use tessera_core::{
  intel::{
    Chunk, ChunkQuery, Document, DocumentQuery, KnowledgeBase, KnowledgeBaseUpdate,
    NewDocument, NewKnowledgeBase, NewProject, NewProjectType, NewResearchSubject,
    NewWorkflow, Project, ProjectType, ProjectTypeUpdate, ProjectUpdate, Report,
    ReportSummary, ResearchSubject, ResearchSubjectUpdate, RunStatus, SubjectQuery,
    Workflow, WorkflowRun, WorkflowUpdate,
  },
  naming::{lineage_base, next_duplicate_name, SuffixStyle},
  page::slugify,
  store::IntelStore,
};
use uuid::Uuid;

use crate::{
  encode::{
    encode_count, encode_dt, encode_uuid, like_pattern, RawChunk, RawDocument, RawKnowledgeBase,
    RawProject, RawProjectType, RawReport, RawReportSummary, RawRun, RawSubject,
    RawWorkflow, DOCUMENT_COLS, KB_COLS, PROJECT_COLS, PROJECT_TYPE_COLS, RUN_COLS,
    SUBJECT_COLS, WORKFLOW_COLS,
  },
  store::{column_values, exists, Outcome, SqliteStore},
  Result,
};

// ─── Row helpers ─────────────────────────────────────────────────────────────

fn kb_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<RawKnowledgeBase>> {
  conn
    .query_row(
      &format!("SELECT {KB_COLS} FROM knowledge_bases WHERE kb_id = ?1"),
      [id],
      RawKnowledgeBase::from_row,
    )
    .optional()
}

fn document_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<RawDocument>> {
  conn
    .query_row(
      &format!("SELECT {DOCUMENT_COLS} FROM documents d WHERE d.document_id = ?1"),
      [id],
      RawDocument::from_row,
    )
    .optional()
}

fn project_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<RawProject>> {
  conn
    .query_row(
      &format!("SELECT {PROJECT_COLS} FROM projects WHERE project_id = ?1"),
      [id],
      RawProject::from_row,
    )
    .optional()
}

fn project_type_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<RawProjectType>> {
  conn
    .query_row(
      &format!("SELECT {PROJECT_TYPE_COLS} FROM project_types WHERE project_type_id = ?1"),
      [id],
      RawProjectType::from_row,
    )
    .optional()
}

fn workflow_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<RawWorkflow>> {
  conn
    .query_row(
      &format!("SELECT {WORKFLOW_COLS} FROM workflows WHERE workflow_id = ?1"),
      [id],
      RawWorkflow::from_row,
    )
    .optional()
}

fn subject_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<RawSubject>> {
  conn
    .query_row(
      &format!("SELECT {SUBJECT_COLS} FROM research_subjects WHERE subject_id = ?1"),
      [id],
      RawSubject::from_row,
    )
    .optional()
}

fn run_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<RawRun>> {
  conn
    .query_row(
      &format!("SELECT {RUN_COLS} FROM workflow_runs WHERE run_id = ?1"),
      [id],
      RawRun::from_row,
    )
    .optional()
}

fn report_by_run(conn: &Connection, run_id: &str) -> rusqlite::Result<Option<RawReport>> {
  conn
    .query_row(
      "SELECT r.run_id, w.subject_id, r.body_json, r.created_at
       FROM reports r
       JOIN workflow_runs w ON w.run_id = r.run_id
       WHERE r.run_id = ?1",
      [run_id],
      |row| {
        Ok(RawReport {
          run_id:     row.get(0)?,
          subject_id: row.get(1)?,
          body_json:  row.get(2)?,
          created_at: row.get(3)?,
        })
      },
    )
    .optional()
}

/// `slug`, slugified, or the slug of `name` when absent or empty.
fn slug_or(slug: Option<&str>, name: &str) -> String {
  slug
    .map(slugify)
    .filter(|s| !s.is_empty())
    .unwrap_or_else(|| slugify(name))
}

fn opt_uuid(id: Option<Uuid>) -> Option<String> { id.map(encode_uuid) }

// ─── IntelStore impl ─────────────────────────────────────────────────────────

impl IntelStore for SqliteStore {
  // ── Knowledge bases ───────────────────────────────────────────────────────

  async fn create_knowledge_base(&self, input: NewKnowledgeBase) -> Result<KnowledgeBase> {
    let now = Utc::now();
    let kb = KnowledgeBase {
      kb_id:       Uuid::new_v4(),
      name:        input.name,
      description: input.description,
      created_at:  now,
      updated_at:  now,
    };

    let id_str = encode_uuid(kb.kb_id);
    let name = kb.name.clone();
    let description = kb.description.clone();
    let at_str = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO knowledge_bases (kb_id, name, description, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?4)",
          rusqlite::params![id_str, name, description, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(kb)
  }

  async fn get_knowledge_base(&self, id: Uuid) -> Result<Option<KnowledgeBase>> {
    let id_str = encode_uuid(id);
    let raw = self.conn.call(move |conn| Ok(kb_by_id(conn, &id_str)?)).await?;
    raw.map(RawKnowledgeBase::into_knowledge_base).transpose()
  }

  async fn list_knowledge_bases(&self) -> Result<Vec<KnowledgeBase>> {
    let raws = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {KB_COLS} FROM knowledge_bases ORDER BY name COLLATE NOCASE"
        ))?;
        let rows = stmt
          .query_map([], RawKnowledgeBase::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawKnowledgeBase::into_knowledge_base).collect()
  }

  async fn update_knowledge_base(
    &self,
    id: Uuid,
    update: KnowledgeBaseUpdate,
  ) -> Result<Option<KnowledgeBase>> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE knowledge_bases SET
             name        = COALESCE(?2, name),
             description = COALESCE(?3, description),
             updated_at  = ?4
           WHERE kb_id = ?1",
          rusqlite::params![id_str, update.name, update.description, at_str],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(kb_by_id(conn, &id_str)?)
      })
      .await?;

    raw.map(RawKnowledgeBase::into_knowledge_base).transpose()
  }

  async fn delete_knowledge_base(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM knowledge_bases WHERE kb_id = ?1", [id_str])?)
      })
      .await?;
    Ok(deleted > 0)
  }

  // ── Documents ─────────────────────────────────────────────────────────────

  async fn create_document(&self, input: NewDocument, chunks: Vec<String>) -> Result<Document> {
    let kb_id = input.kb_id;
    let kb_str = encode_uuid(kb_id);
    let doc_str = encode_uuid(Uuid::new_v4());
    let at_str = encode_dt(Utc::now());

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !exists(&tx, "knowledge_bases", "kb_id", &kb_str)? {
          return Ok(Outcome::Missing("knowledge base", kb_id));
        }
        tx.execute(
          "INSERT INTO documents (document_id, kb_id, title, source_url, mime_type, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            doc_str,
            kb_str,
            input.title,
            input.source_url,
            input.mime_type,
            at_str
          ],
        )?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO chunks (chunk_id, document_id, ordinal, text) VALUES (?1, ?2, ?3, ?4)",
          )?;
          for (ordinal, text) in chunks.iter().enumerate() {
            stmt.execute(rusqlite::params![
              encode_uuid(Uuid::new_v4()),
              doc_str,
              ordinal as i64,
              text
            ])?;
          }
        }
        let doc = document_by_id(&tx, &doc_str)?;
        tx.commit()?;
        Ok(match doc {
          Some(doc) => Outcome::Done(doc),
          None => Outcome::Missing("knowledge base", kb_id),
        })
      })
      .await?;

    outcome.into_result()?.into_document()
  }

  async fn get_document(&self, id: Uuid) -> Result<Option<Document>> {
    let id_str = encode_uuid(id);
    let raw = self.conn.call(move |conn| Ok(document_by_id(conn, &id_str)?)).await?;
    raw.map(RawDocument::into_document).transpose()
  }

  async fn list_documents(&self, query: DocumentQuery) -> Result<Vec<Document>> {
    let kb_str = opt_uuid(query.kb_id);
    let project_str = opt_uuid(query.project_id);
    let include_deleted = query.include_deleted;

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {DOCUMENT_COLS} FROM documents d
           WHERE (?1 IS NULL OR d.kb_id = ?1)
             AND (?2 IS NULL OR EXISTS (
                   SELECT 1 FROM project_documents pd
                   WHERE pd.document_id = d.document_id AND pd.project_id = ?2))
             AND (?3 OR d.deleted_at IS NULL)
           ORDER BY d.created_at DESC, d.title"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![kb_str, project_str, include_deleted],
            RawDocument::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDocument::into_document).collect()
  }

  async fn soft_delete_document(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(Utc::now());
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE documents SET deleted_at = ?2
           WHERE document_id = ?1 AND deleted_at IS NULL",
          [id_str, at_str],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn purge_chunks(&self, document_id: Uuid) -> Result<u64> {
    let id_str = encode_uuid(document_id);
    let purged = self
      .conn
      .call(move |conn| Ok(conn.execute("DELETE FROM chunks WHERE document_id = ?1", [id_str])?))
      .await?;
    Ok(purged as u64)
  }

  async fn document_chunks(&self, document_id: Uuid) -> Result<Vec<Chunk>> {
    let id_str = encode_uuid(document_id);
    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT chunk_id, document_id, ordinal, text FROM chunks
           WHERE document_id = ?1 ORDER BY ordinal",
        )?;
        let rows = stmt
          .query_map([id_str], RawChunk::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawChunk::into_chunk).collect()
  }

  async fn search_chunks(&self, query: ChunkQuery) -> Result<Vec<Chunk>> {
    let terms: Vec<String> = query
      .terms
      .iter()
      .map(|t| t.trim())
      .filter(|t| !t.is_empty())
      .map(like_pattern)
      .collect();

    // ?1 kb, ?2 project, ?3 limit, ?4.. one per term.
    let score = if terms.is_empty() {
      "0".to_owned()
    } else {
      (0..terms.len())
        .map(|i| format!("(c.text LIKE ?{} ESCAPE '\\')", i + 4))
        .collect::<Vec<_>>()
        .join(" + ")
    };
    let must_match = if terms.is_empty() {
      String::new()
    } else {
      format!("AND ({score}) > 0")
    };
    let sql = format!(
      "SELECT c.chunk_id, c.document_id, c.ordinal, c.text, ({score}) AS score
       FROM chunks c
       JOIN documents d ON d.document_id = c.document_id
       WHERE d.deleted_at IS NULL
         AND (?1 IS NULL OR d.kb_id = ?1)
         AND (?2 IS NULL OR EXISTS (
               SELECT 1 FROM project_documents pd
               WHERE pd.document_id = d.document_id AND pd.project_id = ?2))
         {must_match}
       ORDER BY score DESC, d.created_at DESC, c.ordinal
       LIMIT ?3"
    );

    let mut params = vec![
      query.kb_id.map_or(Value::Null, |id| Value::Text(encode_uuid(id))),
      query.project_id.map_or(Value::Null, |id| Value::Text(encode_uuid(id))),
      Value::Integer(encode_count(query.limit)),
    ];
    params.extend(terms.into_iter().map(Value::Text));

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawChunk::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawChunk::into_chunk).collect()
  }

  async fn link_document(&self, document_id: Uuid, project_id: Uuid) -> Result<()> {
    let doc_str = encode_uuid(document_id);
    let project_str = encode_uuid(project_id);
    let at_str = encode_dt(Utc::now());

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !exists(&tx, "documents", "document_id", &doc_str)? {
          return Ok(Outcome::Missing("document", document_id));
        }
        if !exists(&tx, "projects", "project_id", &project_str)? {
          return Ok(Outcome::Missing("project", project_id));
        }
        tx.execute(
          "INSERT OR IGNORE INTO project_documents (project_id, document_id, linked_at)
           VALUES (?1, ?2, ?3)",
          [&project_str, &doc_str, &at_str],
        )?;
        tx.commit()?;
        Ok(Outcome::Done(()))
      })
      .await?;

    outcome.into_result()
  }

  async fn unlink_document(&self, document_id: Uuid, project_id: Uuid) -> Result<bool> {
    let doc_str = encode_uuid(document_id);
    let project_str = encode_uuid(project_id);
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM project_documents WHERE project_id = ?1 AND document_id = ?2",
          [project_str, doc_str],
        )?)
      })
      .await?;
    Ok(deleted > 0)
  }

  // ── Projects ──────────────────────────────────────────────────────────────

  async fn create_project(&self, input: NewProject) -> Result<Project> {
    let now = Utc::now();
    let project = Project {
      project_id:      Uuid::new_v4(),
      name:            input.name,
      description:     input.description,
      project_type_id: input.project_type_id,
      created_at:      now,
      updated_at:      now,
    };

    let id_str = encode_uuid(project.project_id);
    let name = project.name.clone();
    let description = project.description.clone();
    let type_str = opt_uuid(project.project_type_id);
    let at_str = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO projects (project_id, name, description, project_type_id, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
          rusqlite::params![id_str, name, description, type_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(project)
  }

  async fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
    let id_str = encode_uuid(id);
    let raw = self.conn.call(move |conn| Ok(project_by_id(conn, &id_str)?)).await?;
    raw.map(RawProject::into_project).transpose()
  }

  async fn list_projects(&self) -> Result<Vec<Project>> {
    let raws = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PROJECT_COLS} FROM projects ORDER BY name COLLATE NOCASE"
        ))?;
        let rows = stmt
          .query_map([], RawProject::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawProject::into_project).collect()
  }

  async fn update_project(&self, id: Uuid, update: ProjectUpdate) -> Result<Option<Project>> {
    let id_str = encode_uuid(id);
    let type_str = opt_uuid(update.project_type_id);
    let at_str = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE projects SET
             name            = COALESCE(?2, name),
             description     = COALESCE(?3, description),
             project_type_id = COALESCE(?4, project_type_id),
             updated_at      = ?5
           WHERE project_id = ?1",
          rusqlite::params![id_str, update.name, update.description, type_str, at_str],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(project_by_id(conn, &id_str)?)
      })
      .await?;

    raw.map(RawProject::into_project).transpose()
  }

  async fn delete_project(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM projects WHERE project_id = ?1", [id_str])?)
      })
      .await?;
    Ok(deleted > 0)
  }

  // ── Project types ─────────────────────────────────────────────────────────

  async fn create_project_type(&self, input: NewProjectType) -> Result<ProjectType> {
    let project_type = ProjectType {
      project_type_id: Uuid::new_v4(),
      slug:            slug_or(input.slug.as_deref(), &input.name),
      name:            input.name,
      created_at:      Utc::now(),
    };

    let id_str = encode_uuid(project_type.project_type_id);
    let name = project_type.name.clone();
    let slug = project_type.slug.clone();
    let at_str = encode_dt(project_type.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO project_types (project_type_id, name, slug, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          [id_str, name, slug, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(project_type)
  }

  async fn list_project_types(&self) -> Result<Vec<ProjectType>> {
    let raws = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PROJECT_TYPE_COLS} FROM project_types ORDER BY name COLLATE NOCASE"
        ))?;
        let rows = stmt
          .query_map([], RawProjectType::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawProjectType::into_project_type).collect()
  }

  async fn update_project_type(
    &self,
    id: Uuid,
    update: ProjectTypeUpdate,
  ) -> Result<Option<ProjectType>> {
    let id_str = encode_uuid(id);
    let slug = update.slug.as_deref().map(slugify).filter(|s| !s.is_empty());

    let raw = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE project_types SET
             name = COALESCE(?2, name),
             slug = COALESCE(?3, slug)
           WHERE project_type_id = ?1",
          rusqlite::params![id_str, update.name, slug],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(project_type_by_id(conn, &id_str)?)
      })
      .await?;

    raw.map(RawProjectType::into_project_type).transpose()
  }

  async fn delete_project_type(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM project_types WHERE project_type_id = ?1", [id_str])?)
      })
      .await?;
    Ok(deleted > 0)
  }

  // ── Workflows ─────────────────────────────────────────────────────────────

  async fn create_workflow(&self, input: NewWorkflow) -> Result<Workflow> {
    let now = Utc::now();
    let workflow = Workflow {
      workflow_id:     Uuid::new_v4(),
      name:            input.name,
      description:     input.description,
      webhook_url:     input.webhook_url,
      project_type_id: input.project_type_id,
      active:          input.active,
      created_at:      now,
      updated_at:      now,
    };

    let id_str = encode_uuid(workflow.workflow_id);
    let w = workflow.clone();
    let type_str = opt_uuid(w.project_type_id);
    let at_str = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO workflows (
             workflow_id, name, description, webhook_url, project_type_id,
             active, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
          rusqlite::params![
            id_str,
            w.name,
            w.description,
            w.webhook_url,
            type_str,
            w.active,
            at_str
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(workflow)
  }

  async fn get_workflow(&self, id: Uuid) -> Result<Option<Workflow>> {
    let id_str = encode_uuid(id);
    let raw = self.conn.call(move |conn| Ok(workflow_by_id(conn, &id_str)?)).await?;
    raw.map(RawWorkflow::into_workflow).transpose()
  }

  async fn list_workflows(&self, project_type_id: Option<Uuid>) -> Result<Vec<Workflow>> {
    let type_str = opt_uuid(project_type_id);
    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {WORKFLOW_COLS} FROM workflows
           WHERE (?1 IS NULL OR project_type_id = ?1)
           ORDER BY name COLLATE NOCASE"
        ))?;
        let rows = stmt
          .query_map([type_str], RawWorkflow::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawWorkflow::into_workflow).collect()
  }

  async fn update_workflow(&self, id: Uuid, update: WorkflowUpdate) -> Result<Option<Workflow>> {
    let id_str = encode_uuid(id);
    let type_str = opt_uuid(update.project_type_id);
    let at_str = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE workflows SET
             name            = COALESCE(?2, name),
             description     = COALESCE(?3, description),
             webhook_url     = COALESCE(?4, webhook_url),
             project_type_id = COALESCE(?5, project_type_id),
             active          = COALESCE(?6, active),
             updated_at      = ?7
           WHERE workflow_id = ?1",
          rusqlite::params![
            id_str,
            update.name,
            update.description,
            update.webhook_url,
            type_str,
            update.active,
            at_str
          ],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(workflow_by_id(conn, &id_str)?)
      })
      .await?;

    raw.map(RawWorkflow::into_workflow).transpose()
  }

  async fn delete_workflow(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM workflows WHERE workflow_id = ?1", [id_str])?)
      })
      .await?;
    Ok(deleted > 0)
  }

  // ── Research subjects ─────────────────────────────────────────────────────

  async fn create_subject(&self, input: NewResearchSubject) -> Result<ResearchSubject> {
    let now = Utc::now();
    let subject = ResearchSubject {
      subject_id:      Uuid::new_v4(),
      name:            input.name,
      category:        input.category,
      description:     input.description,
      project_type_id: input.project_type_id,
      created_at:      now,
      updated_at:      now,
    };

    let id_str = encode_uuid(subject.subject_id);
    let s = subject.clone();
    let type_str = opt_uuid(s.project_type_id);
    let at_str = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO research_subjects (
             subject_id, name, category, description, project_type_id, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
          rusqlite::params![id_str, s.name, s.category, s.description, type_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(subject)
  }

  async fn get_subject(&self, id: Uuid) -> Result<Option<ResearchSubject>> {
    let id_str = encode_uuid(id);
    let raw = self.conn.call(move |conn| Ok(subject_by_id(conn, &id_str)?)).await?;
    raw.map(RawSubject::into_subject).transpose()
  }

  async fn list_subjects(&self, query: SubjectQuery) -> Result<Vec<ResearchSubject>> {
    let pattern = query.search.as_deref().map(like_pattern);
    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SUBJECT_COLS} FROM research_subjects
           WHERE (?1 IS NULL OR name LIKE ?1 ESCAPE '\\' OR description LIKE ?1 ESCAPE '\\')
             AND (?2 IS NULL OR category = ?2)
           ORDER BY name COLLATE NOCASE"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![pattern, query.category], RawSubject::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawSubject::into_subject).collect()
  }

  async fn update_subject(
    &self,
    id: Uuid,
    update: ResearchSubjectUpdate,
  ) -> Result<Option<ResearchSubject>> {
    let id_str = encode_uuid(id);
    let type_str = opt_uuid(update.project_type_id);
    let at_str = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE research_subjects SET
             name            = COALESCE(?2, name),
             category        = COALESCE(?3, category),
             description     = COALESCE(?4, description),
             project_type_id = COALESCE(?5, project_type_id),
             updated_at      = ?6
           WHERE subject_id = ?1",
          rusqlite::params![
            id_str,
            update.name,
            update.category,
            update.description,
            type_str,
            at_str
          ],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(subject_by_id(conn, &id_str)?)
      })
      .await?;

    raw.map(RawSubject::into_subject).transpose()
  }

  async fn delete_subject(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM research_subjects WHERE subject_id = ?1", [id_str])?)
      })
      .await?;
    Ok(deleted > 0)
  }

  async fn duplicate_subject(&self, id: Uuid) -> Result<Option<ResearchSubject>> {
    let src_str = encode_uuid(id);
    let new_str = encode_uuid(Uuid::new_v4());
    let at_str = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let Some(src) = subject_by_id(&tx, &src_str)? else {
          return Ok(None);
        };
        let base = lineage_base(&src.name, SuffixStyle::Copy);
        let existing = column_values(
          &tx,
          "SELECT name FROM research_subjects WHERE substr(name, 1, length(?1)) = ?1",
          [base],
        )?;
        let name =
          next_duplicate_name(&src.name, SuffixStyle::Copy, existing.iter().map(String::as_str));
        tx.execute(
          "INSERT INTO research_subjects (
             subject_id, name, category, description, project_type_id, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
          rusqlite::params![
            new_str,
            name,
            src.category,
            src.description,
            src.project_type_id,
            at_str
          ],
        )?;
        let clone = subject_by_id(&tx, &new_str)?;
        tx.commit()?;
        Ok(clone)
      })
      .await?;

    raw.map(RawSubject::into_subject).transpose()
  }

  // ── Runs and reports ──────────────────────────────────────────────────────

  async fn create_run(&self, workflow_id: Uuid, subject_id: Uuid) -> Result<WorkflowRun> {
    let run = WorkflowRun {
      run_id: Uuid::new_v4(),
      workflow_id,
      subject_id,
      status: RunStatus::Pending,
      error: None,
      created_at: Utc::now(),
      finished_at: None,
    };

    let run_str = encode_uuid(run.run_id);
    let workflow_str = encode_uuid(workflow_id);
    let subject_str = encode_uuid(subject_id);
    let at_str = encode_dt(run.created_at);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !exists(&tx, "workflows", "workflow_id", &workflow_str)? {
          return Ok(Outcome::Missing("workflow", workflow_id));
        }
        if !exists(&tx, "research_subjects", "subject_id", &subject_str)? {
          return Ok(Outcome::Missing("research subject", subject_id));
        }
        tx.execute(
          "INSERT INTO workflow_runs (run_id, workflow_id, subject_id, status, created_at)
           VALUES (?1, ?2, ?3, 'pending', ?4)",
          [&run_str, &workflow_str, &subject_str, &at_str],
        )?;
        tx.commit()?;
        Ok(Outcome::Done(()))
      })
      .await?;

    outcome.into_result()?;
    Ok(run)
  }

  async fn get_run(&self, run_id: Uuid) -> Result<Option<WorkflowRun>> {
    let id_str = encode_uuid(run_id);
    let raw = self.conn.call(move |conn| Ok(run_by_id(conn, &id_str)?)).await?;
    raw.map(RawRun::into_run).transpose()
  }

  async fn finish_run(
    &self,
    run_id: Uuid,
    status: RunStatus,
    error: Option<String>,
  ) -> Result<Option<WorkflowRun>> {
    let id_str = encode_uuid(run_id);
    let finished = (status != RunStatus::Pending).then(|| encode_dt(Utc::now()));

    let raw = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE workflow_runs SET status = ?2, error = ?3, finished_at = ?4
           WHERE run_id = ?1",
          rusqlite::params![id_str, status.as_str(), error, finished],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(run_by_id(conn, &id_str)?)
      })
      .await?;

    raw.map(RawRun::into_run).transpose()
  }

  async fn save_report(&self, run_id: Uuid, body: serde_json::Value) -> Result<Report> {
    let run_str = encode_uuid(run_id);
    let body_json = body.to_string();
    let at_str = encode_dt(Utc::now());

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !exists(&tx, "workflow_runs", "run_id", &run_str)? {
          return Ok(Outcome::Missing("run", run_id));
        }
        tx.execute(
          "INSERT INTO reports (run_id, body_json, created_at) VALUES (?1, ?2, ?3)
           ON CONFLICT (run_id) DO UPDATE
             SET body_json = excluded.body_json, created_at = excluded.created_at",
          [&run_str, &body_json, &at_str],
        )?;
        tx.execute(
          "UPDATE workflow_runs SET status = 'completed', error = NULL, finished_at = ?2
           WHERE run_id = ?1",
          [&run_str, &at_str],
        )?;
        let report = report_by_run(&tx, &run_str)?;
        tx.commit()?;
        Ok(match report {
          Some(report) => Outcome::Done(report),
          None => Outcome::Missing("run", run_id),
        })
      })
      .await?;

    outcome.into_result()?.into_report()
  }

  async fn get_report(&self, run_id: Uuid) -> Result<Option<Report>> {
    let id_str = encode_uuid(run_id);
    let raw = self.conn.call(move |conn| Ok(report_by_run(conn, &id_str)?)).await?;
    raw.map(RawReport::into_report).transpose()
  }

  async fn list_reports(&self, subject_id: Option<Uuid>) -> Result<Vec<ReportSummary>> {
    let subject_str = opt_uuid(subject_id);
    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT r.run_id, w.subject_id, s.name, w.workflow_id, r.created_at
           FROM reports r
           JOIN workflow_runs w     ON w.run_id = r.run_id
           JOIN research_subjects s ON s.subject_id = w.subject_id
           WHERE (?1 IS NULL OR w.subject_id = ?1)
           ORDER BY r.created_at DESC",
        )?;
        let rows = stmt
          .query_map([subject_str], |row| {
            Ok(RawReportSummary {
              run_id:       row.get(0)?,
              subject_id:   row.get(1)?,
              subject_name: row.get(2)?,
              workflow_id:  row.get(3)?,
              created_at:   row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawReportSummary::into_summary).collect()
  }
}
