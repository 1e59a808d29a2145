//! SQL schema for the Tessera SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- ── Site content ────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS pages (
    page_id     TEXT PRIMARY KEY,
    title       TEXT NOT NULL,
    slug        TEXT NOT NULL UNIQUE,
    description TEXT,
    status      TEXT NOT NULL DEFAULT 'draft',  -- 'published' | 'draft' | 'deactivated'
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sections (
    section_id   TEXT PRIMARY KEY,
    name         TEXT NOT NULL UNIQUE,
    kind         TEXT NOT NULL,
    content_json TEXT NOT NULL DEFAULT '{}',
    status       TEXT NOT NULL DEFAULT 'draft',
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

-- Every content item kind shares this table; `label` is the kind-specific
-- unique text (FAQ question, testimonial name, CTA label...).
CREATE TABLE IF NOT EXISTS items (
    item_id    TEXT PRIMARY KEY,
    kind       TEXT NOT NULL,
    label      TEXT NOT NULL,
    value_json TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (kind, label)
);

CREATE TABLE IF NOT EXISTS page_sections (
    page_id    TEXT NOT NULL REFERENCES pages(page_id) ON DELETE CASCADE,
    section_id TEXT NOT NULL REFERENCES sections(section_id) ON DELETE CASCADE,
    position   INTEGER NOT NULL,
    status     TEXT NOT NULL DEFAULT 'draft',
    PRIMARY KEY (page_id, section_id)
);

CREATE TABLE IF NOT EXISTS section_items (
    section_id TEXT NOT NULL REFERENCES sections(section_id) ON DELETE CASCADE,
    item_id    TEXT NOT NULL REFERENCES items(item_id) ON DELETE CASCADE,
    position   INTEGER NOT NULL,
    status     TEXT NOT NULL DEFAULT 'draft',
    PRIMARY KEY (section_id, item_id)
);

CREATE TABLE IF NOT EXISTS settings (
    key        TEXT PRIMARY KEY,
    value_json TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- ── Analytics ───────────────────────────────────────────────────────────────

-- Append-only. No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS analytics_events (
    event_id      TEXT PRIMARY KEY,
    event_type    TEXT NOT NULL,
    entity_type   TEXT,
    entity_id     TEXT,
    session_id    TEXT,
    page_path     TEXT,
    country       TEXT,
    city          TEXT,
    metadata_json TEXT NOT NULL DEFAULT 'null',
    created_at    TEXT NOT NULL               -- RFC 3339 UTC; first 10 chars are the UTC day
);

-- ── Intel ───────────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS knowledge_bases (
    kb_id       TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    description TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS documents (
    document_id TEXT PRIMARY KEY,
    kb_id       TEXT NOT NULL REFERENCES knowledge_bases(kb_id) ON DELETE CASCADE,
    title       TEXT NOT NULL,
    source_url  TEXT,
    mime_type   TEXT,
    created_at  TEXT NOT NULL,
    deleted_at  TEXT
);

CREATE TABLE IF NOT EXISTS chunks (
    chunk_id    TEXT PRIMARY KEY,
    document_id TEXT NOT NULL REFERENCES documents(document_id) ON DELETE CASCADE,
    ordinal     INTEGER NOT NULL,
    text        TEXT NOT NULL,
    UNIQUE (document_id, ordinal)
);

CREATE TABLE IF NOT EXISTS project_types (
    project_type_id TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    slug            TEXT NOT NULL UNIQUE,
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS projects (
    project_id      TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    description     TEXT,
    project_type_id TEXT REFERENCES project_types(project_type_id) ON DELETE SET NULL,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS project_documents (
    project_id  TEXT NOT NULL REFERENCES projects(project_id) ON DELETE CASCADE,
    document_id TEXT NOT NULL REFERENCES documents(document_id) ON DELETE CASCADE,
    linked_at   TEXT NOT NULL,
    PRIMARY KEY (project_id, document_id)
);

CREATE TABLE IF NOT EXISTS workflows (
    workflow_id     TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    description     TEXT,
    webhook_url     TEXT NOT NULL,
    project_type_id TEXT REFERENCES project_types(project_type_id) ON DELETE SET NULL,
    active          INTEGER NOT NULL DEFAULT 1,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS research_subjects (
    subject_id      TEXT PRIMARY KEY,
    name            TEXT NOT NULL UNIQUE,
    category        TEXT,
    description     TEXT,
    project_type_id TEXT REFERENCES project_types(project_type_id) ON DELETE SET NULL,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS workflow_runs (
    run_id      TEXT PRIMARY KEY,
    workflow_id TEXT NOT NULL REFERENCES workflows(workflow_id) ON DELETE CASCADE,
    subject_id  TEXT NOT NULL REFERENCES research_subjects(subject_id) ON DELETE CASCADE,
    status      TEXT NOT NULL DEFAULT 'pending',  -- 'pending' | 'completed' | 'failed'
    error       TEXT,
    created_at  TEXT NOT NULL,
    finished_at TEXT
);

CREATE TABLE IF NOT EXISTS reports (
    run_id     TEXT PRIMARY KEY REFERENCES workflow_runs(run_id) ON DELETE CASCADE,
    body_json  TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- ── Chat ────────────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS conversations (
    conversation_id TEXT PRIMARY KEY,
    title           TEXT NOT NULL,
    kb_id           TEXT REFERENCES knowledge_bases(kb_id) ON DELETE SET NULL,
    project_id      TEXT REFERENCES projects(project_id) ON DELETE SET NULL,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS chat_messages (
    message_id      TEXT PRIMARY KEY,
    conversation_id TEXT NOT NULL REFERENCES conversations(conversation_id) ON DELETE CASCADE,
    seq             INTEGER NOT NULL,
    role            TEXT NOT NULL,     -- 'system' | 'user' | 'assistant'
    content         TEXT NOT NULL,
    model           TEXT,
    created_at      TEXT NOT NULL,
    UNIQUE (conversation_id, seq)
);

-- ── Auth ────────────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS sessions (
    token_hash TEXT PRIMARY KEY,       -- SHA-256 hex of the bearer token
    username   TEXT NOT NULL,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS items_kind_idx            ON items(kind);
CREATE INDEX IF NOT EXISTS page_sections_section_idx ON page_sections(section_id);
CREATE INDEX IF NOT EXISTS section_items_item_idx    ON section_items(item_id);
CREATE INDEX IF NOT EXISTS events_created_idx        ON analytics_events(created_at);
CREATE INDEX IF NOT EXISTS events_entity_idx         ON analytics_events(entity_type, entity_id);
CREATE INDEX IF NOT EXISTS documents_kb_idx          ON documents(kb_id);
CREATE INDEX IF NOT EXISTS runs_subject_idx          ON workflow_runs(subject_id);

PRAGMA user_version = 1;
";
