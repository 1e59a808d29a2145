//! [`ContentStore`] for [`SqliteStore`]: pages, sections, items, the
//! junctions between them and settings.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _};
use tessera_core::{
  item::{Item, ItemKind, ItemValue},
  naming::{lineage_base, next_duplicate_name, SuffixStyle},
  page::{slugify, NewPage, Page, PageSection, PageUpdate, SectionLinkInput},
  section::{NewSection, Section, SectionItem, SectionUpdate},
  status::{LinkUpdate, PublishStatus},
  store::{ContentStore, PageQuery, SectionQuery},
};
use uuid::Uuid;

use crate::{
  encode::{
    encode_dt, encode_uuid, like_pattern, RawItem, RawLink, RawPage, RawSection,
    ITEM_COLS, PAGE_COLS, SECTION_COLS,
  },
  store::{column_values, exists, Outcome, SqliteStore},
  Error, Result,
};

// ─── Row helpers ─────────────────────────────────────────────────────────────

fn page_by(conn: &Connection, column: &str, value: &str) -> rusqlite::Result<Option<RawPage>> {
  conn
    .query_row(
      &format!("SELECT {PAGE_COLS} FROM pages p WHERE p.{column} = ?1"),
      [value],
      RawPage::from_row,
    )
    .optional()
}

fn section_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<RawSection>> {
  conn
    .query_row(
      &format!("SELECT {SECTION_COLS} FROM sections s WHERE s.section_id = ?1"),
      [id],
      RawSection::from_row,
    )
    .optional()
}

fn item_by_id(
  conn: &Connection,
  kind: Option<&str>,
  id: &str,
) -> rusqlite::Result<Option<RawItem>> {
  conn
    .query_row(
      &format!(
        "SELECT {ITEM_COLS} FROM items i
         WHERE i.item_id = ?1 AND (?2 IS NULL OR i.kind = ?2)"
      ),
      rusqlite::params![id, kind],
      RawItem::from_row,
    )
    .optional()
}

/// `max(position) + 1` within a container, `0` when it is empty.
fn next_position(
  conn: &Connection,
  table: &str,
  column: &str,
  id: &str,
) -> rusqlite::Result<i64> {
  conn.query_row(
    &format!("SELECT COALESCE(MAX(position) + 1, 0) FROM {table} WHERE {column} = ?1"),
    [id],
    |row| row.get(0),
  )
}

/// Section links of a page in position order, or the single link to
/// `section_id`.
fn page_links(
  conn: &Connection,
  page_id: &str,
  section_id: Option<&str>,
) -> rusqlite::Result<Vec<RawLink<RawSection>>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT ps.page_id, ps.position, ps.status, {SECTION_COLS}
     FROM page_sections ps
     JOIN sections s ON s.section_id = ps.section_id
     WHERE ps.page_id = ?1 AND (?2 IS NULL OR ps.section_id = ?2)
     ORDER BY ps.position, s.name"
  ))?;
  let rows = stmt
    .query_map(rusqlite::params![page_id, section_id], |row| {
      RawLink::from_row(row, RawSection::from_row_at)
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

/// Item links of a section in position order, or the single link to
/// `item_id`.
fn section_links(
  conn: &Connection,
  section_id: &str,
  item_id: Option<&str>,
) -> rusqlite::Result<Vec<RawLink<RawItem>>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT si.section_id, si.position, si.status, {ITEM_COLS}
     FROM section_items si
     JOIN items i ON i.item_id = si.item_id
     WHERE si.section_id = ?1 AND (?2 IS NULL OR si.item_id = ?2)
     ORDER BY si.position, i.label"
  ))?;
  let rows = stmt
    .query_map(rusqlite::params![section_id, item_id], |row| {
      RawLink::from_row(row, RawItem::from_row_at)
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

fn decode_page_link(raw: RawLink<RawSection>) -> Result<PageSection> {
  let (page_id, position, status) = raw.decode_head()?;
  Ok(PageSection { page_id, position, status, section: raw.target.into_section()? })
}

fn decode_section_link(raw: RawLink<RawItem>) -> Result<SectionItem> {
  let (section_id, position, status) = raw.decode_head()?;
  Ok(SectionItem { section_id, position, status, item: raw.target.into_item()? })
}

/// The name a duplicate should take, given the query listing every value of
/// the unique column that shares the source's lineage base (bound as `?1`).
fn duplicate_name(
  conn: &Connection,
  source: &str,
  style: SuffixStyle,
  lineage_sql: &str,
) -> rusqlite::Result<String> {
  let base = lineage_base(source, style);
  let existing = column_values(conn, lineage_sql, [base])?;
  Ok(next_duplicate_name(source, style, existing.iter().map(String::as_str)))
}

fn json_error(e: serde_json::Error) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(e))
}

/// Outcome of [`ContentStore::update_item`] before decoding.
enum ItemWrite {
  Updated(RawItem),
  Missing,
  WrongKind(String),
}

// ─── ContentStore impl ───────────────────────────────────────────────────────

impl ContentStore for SqliteStore {
  // ── Pages ─────────────────────────────────────────────────────────────────

  async fn create_page(&self, input: NewPage) -> Result<Page> {
    let now = Utc::now();
    let page_id = Uuid::new_v4();
    let slug = input
      .slug
      .as_deref()
      .map(slugify)
      .filter(|s| !s.is_empty())
      .unwrap_or_else(|| slugify(&input.title));
    let slug = if slug.is_empty() {
      format!("page-{}", &page_id.simple().to_string()[..8])
    } else {
      slug
    };

    let page = Page {
      page_id,
      title: input.title,
      slug,
      description: input.description,
      status: input.status,
      created_at: now,
      updated_at: now,
    };

    let id_str = encode_uuid(page_id);
    let title = page.title.clone();
    let slug = page.slug.clone();
    let description = page.description.clone();
    let status = page.status.as_str();
    let at_str = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO pages (page_id, title, slug, description, status, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
          rusqlite::params![id_str, title, slug, description, status, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(page)
  }

  async fn get_page(&self, id: Uuid) -> Result<Option<Page>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| Ok(page_by(conn, "page_id", &id_str)?))
      .await?;
    raw.map(RawPage::into_page).transpose()
  }

  async fn get_page_by_slug(&self, slug: String) -> Result<Option<Page>> {
    let raw = self
      .conn
      .call(move |conn| Ok(page_by(conn, "slug", &slug)?))
      .await?;
    raw.map(RawPage::into_page).transpose()
  }

  async fn list_pages(&self, query: PageQuery) -> Result<Vec<Page>> {
    let pattern = query.search.as_deref().map(like_pattern);
    let status = query.status.map(PublishStatus::as_str);

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PAGE_COLS} FROM pages p
           WHERE (?1 IS NULL OR p.title LIKE ?1 ESCAPE '\\' OR p.slug LIKE ?1 ESCAPE '\\')
             AND (?2 IS NULL OR p.status = ?2)
           ORDER BY p.title COLLATE NOCASE, p.slug"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![pattern, status], RawPage::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPage::into_page).collect()
  }

  async fn update_page(&self, id: Uuid, update: PageUpdate) -> Result<Option<Page>> {
    let id_str = encode_uuid(id);
    let slug = update.slug.as_deref().map(slugify).filter(|s| !s.is_empty());
    let status = update.status.map(PublishStatus::as_str);
    let at_str = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE pages SET
             title       = COALESCE(?2, title),
             slug        = COALESCE(?3, slug),
             description = COALESCE(?4, description),
             status      = COALESCE(?5, status),
             updated_at  = ?6
           WHERE page_id = ?1",
          rusqlite::params![id_str, update.title, slug, update.description, status, at_str],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(page_by(conn, "page_id", &id_str)?)
      })
      .await?;

    raw.map(RawPage::into_page).transpose()
  }

  async fn delete_page(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM pages WHERE page_id = ?1", [id_str])?)
      })
      .await?;
    Ok(deleted > 0)
  }

  async fn duplicate_page(&self, id: Uuid) -> Result<Option<Page>> {
    let src_str = encode_uuid(id);
    let new_str = encode_uuid(Uuid::new_v4());
    let at_str = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let Some(src) = page_by(&tx, "page_id", &src_str)? else {
          return Ok(None);
        };

        let title = duplicate_name(
          &tx,
          &src.title,
          SuffixStyle::Copy,
          "SELECT title FROM pages WHERE substr(title, 1, length(?1)) = ?1",
        )?;
        let slug = duplicate_name(
          &tx,
          &src.slug,
          SuffixStyle::Slug,
          "SELECT slug FROM pages WHERE substr(slug, 1, length(?1)) = ?1",
        )?;

        tx.execute(
          "INSERT INTO pages (page_id, title, slug, description, status, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, 'draft', ?5, ?5)",
          rusqlite::params![new_str, title, slug, src.description, at_str],
        )?;
        tx.execute(
          "INSERT INTO page_sections (page_id, section_id, position, status)
           SELECT ?1, section_id, position, status FROM page_sections WHERE page_id = ?2",
          rusqlite::params![new_str, src_str],
        )?;
        tx.commit()?;

        Ok(page_by(conn, "page_id", &new_str)?)
      })
      .await?;

    raw.map(RawPage::into_page).transpose()
  }

  // ── Page ↔ section links ──────────────────────────────────────────────────

  async fn page_sections(&self, page_id: Uuid) -> Result<Vec<PageSection>> {
    let id_str = encode_uuid(page_id);
    let raws = self
      .conn
      .call(move |conn| Ok(page_links(conn, &id_str, None)?))
      .await?;
    raws.into_iter().map(decode_page_link).collect()
  }

  async fn attach_section(
    &self,
    page_id: Uuid,
    section_id: Uuid,
    status: PublishStatus,
  ) -> Result<PageSection> {
    let page_str = encode_uuid(page_id);
    let section_str = encode_uuid(section_id);
    let status = status.as_str();

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !exists(&tx, "pages", "page_id", &page_str)? {
          return Ok(Outcome::Missing("page", page_id));
        }
        if !exists(&tx, "sections", "section_id", &section_str)? {
          return Ok(Outcome::Missing("section", section_id));
        }
        let position = next_position(&tx, "page_sections", "page_id", &page_str)?;
        tx.execute(
          "INSERT INTO page_sections (page_id, section_id, position, status)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![page_str, section_str, position, status],
        )?;
        let link = page_links(&tx, &page_str, Some(&section_str))?.pop();
        tx.commit()?;
        Ok(match link {
          Some(link) => Outcome::Done(link),
          None => Outcome::Missing("section", section_id),
        })
      })
      .await?;

    decode_page_link(outcome.into_result()?)
  }

  async fn update_page_section(
    &self,
    page_id: Uuid,
    section_id: Uuid,
    update: LinkUpdate,
  ) -> Result<Option<PageSection>> {
    let page_str = encode_uuid(page_id);
    let section_str = encode_uuid(section_id);
    let status = update.status.map(PublishStatus::as_str);

    let raw = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE page_sections SET
             position = COALESCE(?3, position),
             status   = COALESCE(?4, status)
           WHERE page_id = ?1 AND section_id = ?2",
          rusqlite::params![page_str, section_str, update.position, status],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(page_links(conn, &page_str, Some(&section_str))?.pop())
      })
      .await?;

    raw.map(decode_page_link).transpose()
  }

  async fn detach_section(&self, page_id: Uuid, section_id: Uuid) -> Result<bool> {
    let page_str = encode_uuid(page_id);
    let section_str = encode_uuid(section_id);
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM page_sections WHERE page_id = ?1 AND section_id = ?2",
          [page_str, section_str],
        )?)
      })
      .await?;
    Ok(deleted > 0)
  }

  async fn replace_page_sections(
    &self,
    page_id: Uuid,
    links: Vec<SectionLinkInput>,
  ) -> Result<Vec<PageSection>> {
    let page_str = encode_uuid(page_id);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !exists(&tx, "pages", "page_id", &page_str)? {
          return Ok(Outcome::Missing("page", page_id));
        }
        tx.execute("DELETE FROM page_sections WHERE page_id = ?1", [&page_str])?;
        for (position, link) in links.iter().enumerate() {
          let section_str = encode_uuid(link.section_id);
          if !exists(&tx, "sections", "section_id", &section_str)? {
            return Ok(Outcome::Missing("section", link.section_id));
          }
          tx.execute(
            "INSERT INTO page_sections (page_id, section_id, position, status)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![page_str, section_str, position as i64, link.status.as_str()],
          )?;
        }
        let rows = page_links(&tx, &page_str, None)?;
        tx.commit()?;
        Ok(Outcome::Done(rows))
      })
      .await?;

    outcome.into_result()?.into_iter().map(decode_page_link).collect()
  }

  // ── Sections ──────────────────────────────────────────────────────────────

  async fn create_section(&self, input: NewSection) -> Result<Section> {
    let now = Utc::now();
    let section = Section {
      section_id: Uuid::new_v4(),
      name:       input.name,
      kind:       input.kind,
      content:    input.content,
      status:     input.status,
      created_at: now,
      updated_at: now,
    };

    let id_str = encode_uuid(section.section_id);
    let name = section.name.clone();
    let kind = section.kind.as_str();
    let content = section.content.to_string();
    let status = section.status.as_str();
    let at_str = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sections (section_id, name, kind, content_json, status, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
          rusqlite::params![id_str, name, kind, content, status, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(section)
  }

  async fn get_section(&self, id: Uuid) -> Result<Option<Section>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| Ok(section_by_id(conn, &id_str)?))
      .await?;
    raw.map(RawSection::into_section).transpose()
  }

  async fn list_sections(&self, query: SectionQuery) -> Result<Vec<Section>> {
    let pattern = query.search.as_deref().map(like_pattern);
    let kind = query.kind.map(|k| k.as_str());
    let status = query.status.map(PublishStatus::as_str);

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SECTION_COLS} FROM sections s
           WHERE (?1 IS NULL OR s.name LIKE ?1 ESCAPE '\\')
             AND (?2 IS NULL OR s.kind = ?2)
             AND (?3 IS NULL OR s.status = ?3)
           ORDER BY s.name COLLATE NOCASE"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![pattern, kind, status], RawSection::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSection::into_section).collect()
  }

  async fn update_section(&self, id: Uuid, update: SectionUpdate) -> Result<Option<Section>> {
    let id_str = encode_uuid(id);
    let kind = update.kind.map(|k| k.as_str());
    let content = update.content.map(|c| c.to_string());
    let status = update.status.map(PublishStatus::as_str);
    let at_str = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE sections SET
             name         = COALESCE(?2, name),
             kind         = COALESCE(?3, kind),
             content_json = COALESCE(?4, content_json),
             status       = COALESCE(?5, status),
             updated_at   = ?6
           WHERE section_id = ?1",
          rusqlite::params![id_str, update.name, kind, content, status, at_str],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(section_by_id(conn, &id_str)?)
      })
      .await?;

    raw.map(RawSection::into_section).transpose()
  }

  async fn delete_section(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM sections WHERE section_id = ?1", [id_str])?)
      })
      .await?;
    Ok(deleted > 0)
  }

  async fn duplicate_section(&self, id: Uuid, page_id: Option<Uuid>) -> Result<Option<Section>> {
    let src_str = encode_uuid(id);
    let new_str = encode_uuid(Uuid::new_v4());
    let page_str = page_id.map(encode_uuid);
    let at_str = encode_dt(Utc::now());

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let Some(src) = section_by_id(&tx, &src_str)? else {
          return Ok(Outcome::Done(None));
        };
        if let (Some(page_id), Some(page_str)) = (page_id, &page_str)
          && !exists(&tx, "pages", "page_id", page_str)?
        {
          return Ok(Outcome::Missing("page", page_id));
        }

        let name = duplicate_name(
          &tx,
          &src.name,
          SuffixStyle::Version,
          "SELECT name FROM sections WHERE substr(name, 1, length(?1)) = ?1",
        )?;

        tx.execute(
          "INSERT INTO sections (section_id, name, kind, content_json, status, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
          rusqlite::params![new_str, name, src.kind, src.content_json, src.status, at_str],
        )?;
        tx.execute(
          "INSERT INTO section_items (section_id, item_id, position, status)
           SELECT ?1, item_id, position, status FROM section_items WHERE section_id = ?2",
          rusqlite::params![new_str, src_str],
        )?;
        if let Some(page_str) = &page_str {
          let position = next_position(&tx, "page_sections", "page_id", page_str)?;
          tx.execute(
            "INSERT INTO page_sections (page_id, section_id, position, status)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![page_str, new_str, position, src.status],
          )?;
        }
        let clone = section_by_id(&tx, &new_str)?;
        tx.commit()?;
        Ok(Outcome::Done(clone))
      })
      .await?;

    outcome.into_result()?.map(RawSection::into_section).transpose()
  }

  // ── Section ↔ item links ──────────────────────────────────────────────────

  async fn section_items(&self, section_id: Uuid) -> Result<Vec<SectionItem>> {
    let id_str = encode_uuid(section_id);
    let raws = self
      .conn
      .call(move |conn| Ok(section_links(conn, &id_str, None)?))
      .await?;
    raws.into_iter().map(decode_section_link).collect()
  }

  async fn attach_item(
    &self,
    section_id: Uuid,
    item_id: Uuid,
    status: PublishStatus,
  ) -> Result<SectionItem> {
    let section_str = encode_uuid(section_id);
    let item_str = encode_uuid(item_id);
    let status = status.as_str();

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !exists(&tx, "sections", "section_id", &section_str)? {
          return Ok(Outcome::Missing("section", section_id));
        }
        if !exists(&tx, "items", "item_id", &item_str)? {
          return Ok(Outcome::Missing("item", item_id));
        }
        let position = next_position(&tx, "section_items", "section_id", &section_str)?;
        tx.execute(
          "INSERT INTO section_items (section_id, item_id, position, status)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![section_str, item_str, position, status],
        )?;
        let link = section_links(&tx, &section_str, Some(&item_str))?.pop();
        tx.commit()?;
        Ok(match link {
          Some(link) => Outcome::Done(link),
          None => Outcome::Missing("item", item_id),
        })
      })
      .await?;

    decode_section_link(outcome.into_result()?)
  }

  async fn update_section_item(
    &self,
    section_id: Uuid,
    item_id: Uuid,
    update: LinkUpdate,
  ) -> Result<Option<SectionItem>> {
    let section_str = encode_uuid(section_id);
    let item_str = encode_uuid(item_id);
    let status = update.status.map(PublishStatus::as_str);

    let raw = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE section_items SET
             position = COALESCE(?3, position),
             status   = COALESCE(?4, status)
           WHERE section_id = ?1 AND item_id = ?2",
          rusqlite::params![section_str, item_str, update.position, status],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(section_links(conn, &section_str, Some(&item_str))?.pop())
      })
      .await?;

    raw.map(decode_section_link).transpose()
  }

  async fn detach_item(&self, section_id: Uuid, item_id: Uuid) -> Result<bool> {
    let section_str = encode_uuid(section_id);
    let item_str = encode_uuid(item_id);
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM section_items WHERE section_id = ?1 AND item_id = ?2",
          [section_str, item_str],
        )?)
      })
      .await?;
    Ok(deleted > 0)
  }

  // ── Items ─────────────────────────────────────────────────────────────────

  async fn create_item(&self, value: ItemValue) -> Result<Item> {
    let now = Utc::now();
    let item = Item { item_id: Uuid::new_v4(), value, created_at: now, updated_at: now };

    let id_str = encode_uuid(item.item_id);
    let kind = item.value.kind().as_str();
    let label = item.value.label().to_owned();
    let value_json = item.value.to_json()?.to_string();
    let at_str = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO items (item_id, kind, label, value_json, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
          rusqlite::params![id_str, kind, label, value_json, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(item)
  }

  async fn get_item(&self, kind: ItemKind, id: Uuid) -> Result<Option<Item>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| Ok(item_by_id(conn, Some(kind.as_str()), &id_str)?))
      .await?;
    raw.map(RawItem::into_item).transpose()
  }

  async fn list_items(&self, kind: ItemKind, search: Option<String>) -> Result<Vec<Item>> {
    let pattern = search.as_deref().map(like_pattern);

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ITEM_COLS} FROM items i
           WHERE i.kind = ?1 AND (?2 IS NULL OR i.label LIKE ?2 ESCAPE '\\')
           ORDER BY i.label COLLATE NOCASE"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![kind.as_str(), pattern], RawItem::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawItem::into_item).collect()
  }

  async fn update_item(&self, id: Uuid, value: ItemValue) -> Result<Option<Item>> {
    let id_str = encode_uuid(id);
    let kind = value.kind();
    let label = value.label().to_owned();
    let value_json = value.to_json()?.to_string();
    let at_str = encode_dt(Utc::now());

    let write = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE items SET label = ?3, value_json = ?4, updated_at = ?5
           WHERE item_id = ?1 AND kind = ?2",
          rusqlite::params![id_str, kind.as_str(), label, value_json, at_str],
        )?;
        if changed > 0 {
          return Ok(match item_by_id(conn, None, &id_str)? {
            Some(raw) => ItemWrite::Updated(raw),
            None => ItemWrite::Missing,
          });
        }
        Ok(match item_by_id(conn, None, &id_str)? {
          Some(raw) => ItemWrite::WrongKind(raw.kind),
          None => ItemWrite::Missing,
        })
      })
      .await?;

    match write {
      ItemWrite::Updated(raw) => raw.into_item().map(Some),
      ItemWrite::Missing => Ok(None),
      ItemWrite::WrongKind(stored) => Err(Error::KindMismatch {
        id,
        stored,
        given: kind.as_str().to_owned(),
      }),
    }
  }

  async fn delete_item(&self, kind: ItemKind, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM items WHERE item_id = ?1 AND kind = ?2",
          rusqlite::params![id_str, kind.as_str()],
        )?)
      })
      .await?;
    Ok(deleted > 0)
  }

  async fn duplicate_item(
    &self,
    kind: ItemKind,
    id: Uuid,
    section_id: Option<Uuid>,
  ) -> Result<Option<Item>> {
    let src_str = encode_uuid(id);
    let new_str = encode_uuid(Uuid::new_v4());
    let section_str = section_id.map(encode_uuid);
    let at_str = encode_dt(Utc::now());

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let Some(src) = item_by_id(&tx, Some(kind.as_str()), &src_str)? else {
          return Ok(Outcome::Done(None));
        };
        if let (Some(section_id), Some(section_str)) = (section_id, &section_str)
          && !exists(&tx, "sections", "section_id", section_str)?
        {
          return Ok(Outcome::Missing("section", section_id));
        }

        let mut value: serde_json::Value =
          serde_json::from_str(&src.value_json).map_err(json_error)?;
        let current = value
          .get(kind.label_field())
          .and_then(serde_json::Value::as_str)
          .unwrap_or_default()
          .to_owned();
        let base = lineage_base(&current, SuffixStyle::Copy);
        let existing = column_values(
          &tx,
          "SELECT label FROM items WHERE kind = ?1 AND substr(label, 1, length(?2)) = ?2",
          [kind.as_str(), base],
        )?;
        let label =
          next_duplicate_name(&current, SuffixStyle::Copy, existing.iter().map(String::as_str));
        if let Some(fields) = value.as_object_mut() {
          fields.insert(kind.label_field().to_owned(), label.clone().into());
        }

        tx.execute(
          "INSERT INTO items (item_id, kind, label, value_json, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
          rusqlite::params![new_str, kind.as_str(), label, value.to_string(), at_str],
        )?;
        if let Some(section_str) = &section_str {
          let position = next_position(&tx, "section_items", "section_id", section_str)?;
          tx.execute(
            "INSERT INTO section_items (section_id, item_id, position, status)
             VALUES (?1, ?2, ?3, 'draft')",
            rusqlite::params![section_str, new_str, position],
          )?;
        }
        let clone = item_by_id(&tx, None, &new_str)?;
        tx.commit()?;
        Ok(Outcome::Done(clone))
      })
      .await?;

    outcome.into_result()?.map(RawItem::into_item).transpose()
  }

  // ── Settings ──────────────────────────────────────────────────────────────

  async fn get_setting(&self, key: String) -> Result<Option<serde_json::Value>> {
    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row("SELECT value_json FROM settings WHERE key = ?1", [key], |row| {
              row.get(0)
            })
            .optional()?,
        )
      })
      .await?;
    Ok(raw.as_deref().map(serde_json::from_str).transpose()?)
  }

  async fn put_setting(&self, key: String, value: serde_json::Value) -> Result<()> {
    let value_json = value.to_string();
    let at_str = encode_dt(Utc::now());
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO settings (key, value_json, updated_at) VALUES (?1, ?2, ?3)
           ON CONFLICT (key) DO UPDATE
             SET value_json = excluded.value_json, updated_at = excluded.updated_at",
          rusqlite::params![key, value_json, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
