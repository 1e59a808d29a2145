//! Public, unauthenticated reads of the rendered site.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/api/site/pages/:slug` | Published page tree |
//! | `GET`  | `/api/site/theme.css` | `:root` custom properties |
//! | `GET`  | `/sitemap.xml` | Published pages |
//! | `GET`  | `/health` | `ok` |
//!
//! Every read except `/health` is served from the [`TagCache`](crate::TagCache)
//! and rebuilt on a miss.

use std::io::Cursor;

use axum::{
  Router,
  extract::{Path, State},
  routing::get,
};
use bytes::Bytes;
use quick_xml::{
  Writer,
  events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};
use serde::Serialize;
use tessera_core::{
  item::Item,
  page::Page,
  section::Section,
  status::PublishStatus,
  store::{ContentStore, PageQuery, SiteStore},
};

use crate::{
  ApiState,
  admin::theme,
  cache::{self, Cached},
  error::ApiError,
};

const JSON: &str = "application/json";
const CSS: &str = "text/css; charset=utf-8";
const XML: &str = "application/xml; charset=utf-8";

pub fn router<S>() -> Router<ApiState<S>>
where
  S: SiteStore + 'static,
{
  Router::new()
    .route("/api/site/pages/{slug}", get(page::<S>))
    .route("/api/site/theme.css", get(theme_css::<S>))
    .route("/sitemap.xml", get(sitemap::<S>))
    .route("/health", get(health))
}

/// `GET /health`
pub async fn health() -> &'static str { "ok" }

// ─── Page tree ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct PublicPage {
  #[serde(flatten)]
  pub page:     Page,
  pub sections: Vec<PublicSection>,
}

#[derive(Debug, Serialize)]
pub struct PublicSection {
  #[serde(flatten)]
  pub section:  Section,
  pub position: i64,
  pub items:    Vec<Item>,
}

/// The published tree under `slug`: a published page, its published links to
/// published sections, and each section's published item links. `None` when
/// the page is missing or not published.
pub async fn page_tree<S: ContentStore>(
  store: &S,
  slug: &str,
  pull_zone: Option<&str>,
) -> Result<Option<PublicPage>, ApiError> {
  let Some(page) = store
    .get_page_by_slug(slug.to_owned())
    .await
    .map_err(ApiError::store)?
    .filter(|p| p.status.is_published())
  else {
    return Ok(None);
  };

  let links = store.page_sections(page.page_id).await.map_err(ApiError::store)?;
  let mut sections = Vec::new();
  for link in links {
    if !link.status.is_published() || !link.section.status.is_published() {
      continue;
    }
    let items = store
      .section_items(link.section.section_id)
      .await
      .map_err(ApiError::store)?
      .into_iter()
      .filter(|l| l.status.is_published())
      .map(|l| {
        let mut item = l.item;
        item.value.normalize(pull_zone);
        item
      })
      .collect();
    sections.push(PublicSection { section: link.section, position: link.position, items });
  }
  Ok(Some(PublicPage { page, sections }))
}

/// `GET /api/site/pages/:slug`
pub async fn page<S: ContentStore>(
  State(state): State<ApiState<S>>,
  Path(slug): Path<String>,
) -> Result<Cached, ApiError> {
  let key = cache::page_tag(&slug);
  if let Some(hit) = state.cache.get(&key) {
    return Ok(hit);
  }
  let ticket = state.cache.ticket(vec![
    cache::PAGES.to_owned(),
    key.clone(),
    cache::SECTIONS.to_owned(),
    cache::ITEMS.to_owned(),
  ]);

  let tree = page_tree(state.store.as_ref(), &slug, state.settings.pull_zone.as_deref())
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("page {slug} not found")))?;
  let body = serde_json::to_vec(&tree).map_err(|e| ApiError::Store(Box::new(e)))?;
  let rendered = Cached { content_type: JSON, body: Bytes::from(body) };
  state.cache.insert(key, rendered.clone(), ticket);
  Ok(rendered)
}

// ─── Theme ────────────────────────────────────────────────────────────────────

const THEME_KEY: &str = "theme.css";

/// `GET /api/site/theme.css`
pub async fn theme_css<S: ContentStore>(
  State(state): State<ApiState<S>>,
) -> Result<Cached, ApiError> {
  if let Some(hit) = state.cache.get(THEME_KEY) {
    return Ok(hit);
  }
  let ticket = state.cache.ticket(vec![cache::THEME.to_owned()]);
  let css = theme::load(state.store.as_ref()).await?.to_css()?;
  let rendered = Cached { content_type: CSS, body: Bytes::from(css) };
  state.cache.insert(THEME_KEY, rendered.clone(), ticket);
  Ok(rendered)
}

// ─── Sitemap ──────────────────────────────────────────────────────────────────

const SITEMAP_KEY: &str = "sitemap.xml";
const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Location of a page under `base_url`. The `home` slug maps to the root.
fn page_url(base_url: &str, slug: &str) -> String {
  let base = base_url.trim_end_matches('/');
  if slug == "home" { format!("{base}/") } else { format!("{base}/{slug}") }
}

fn text_element(
  w: &mut Writer<Cursor<Vec<u8>>>,
  tag: &str,
  text: &str,
) -> std::io::Result<()> {
  w.write_event(Event::Start(BytesStart::new(tag)))?;
  w.write_event(Event::Text(BytesText::new(text)))?;
  w.write_event(Event::End(BytesEnd::new(tag)))
}

/// Render the `urlset` for `pages`.
pub fn render_sitemap(base_url: &str, pages: &[Page]) -> std::io::Result<Vec<u8>> {
  let mut writer = Writer::new(Cursor::new(Vec::new()));
  writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

  let mut urlset = BytesStart::new("urlset");
  urlset.push_attribute(("xmlns", SITEMAP_NS));
  writer.write_event(Event::Start(urlset))?;
  for page in pages {
    writer.write_event(Event::Start(BytesStart::new("url")))?;
    text_element(&mut writer, "loc", &page_url(base_url, &page.slug))?;
    text_element(&mut writer, "lastmod", &page.updated_at.format("%Y-%m-%d").to_string())?;
    writer.write_event(Event::End(BytesEnd::new("url")))?;
  }
  writer.write_event(Event::End(BytesEnd::new("urlset")))?;
  Ok(writer.into_inner().into_inner())
}

/// `GET /sitemap.xml`
pub async fn sitemap<S: ContentStore>(
  State(state): State<ApiState<S>>,
) -> Result<Cached, ApiError> {
  if let Some(hit) = state.cache.get(SITEMAP_KEY) {
    return Ok(hit);
  }
  let ticket = state.cache.ticket(vec![cache::PAGES.to_owned()]);
  let pages = state
    .store
    .list_pages(PageQuery { search: None, status: Some(PublishStatus::Published) })
    .await
    .map_err(ApiError::store)?;
  let body = render_sitemap(&state.settings.base_url, &pages)
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  let rendered = Cached { content_type: XML, body: Bytes::from(body) };
  state.cache.insert(SITEMAP_KEY, rendered.clone(), ticket);
  Ok(rendered)
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};
  use uuid::Uuid;

  use super::*;

  #[test]
  fn sitemap_lists_pages_with_escaped_locations() {
    let page = |slug: &str| Page {
      page_id:     Uuid::new_v4(),
      title:       slug.into(),
      slug:        slug.into(),
      description: None,
      status:      PublishStatus::Published,
      created_at:  Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap(),
      updated_at:  Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap(),
    };
    let xml = render_sitemap("https://example.com/", &[page("home"), page("a&b")]).unwrap();
    let xml = String::from_utf8(xml).unwrap();
    assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
    assert!(xml.contains(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#));
    assert!(xml.contains("<loc>https://example.com/</loc>"));
    assert!(xml.contains("<loc>https://example.com/a&amp;b</loc>"));
    assert!(xml.contains("<lastmod>2025-03-04</lastmod>"));
  }
}
