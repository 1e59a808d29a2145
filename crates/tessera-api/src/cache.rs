//! Process-local cache of rendered public reads, invalidated by tag.
//!
//! Every entry carries the tags of the resources it was built from. Admin
//! mutations call [`TagCache::invalidate`] with the tag of the resource type
//! they touched, which drops every entry built from it.
//!
//! Each tag also has a generation, bumped on every invalidation. A reader
//! takes a [`Ticket`] before reading the store and the fill is refused when
//! any of its tags moved in the meantime, so a render started before a
//! mutation never outlives it.

use axum::{
  http::header,
  response::{IntoResponse, Response},
};
use bytes::Bytes;
use dashmap::DashMap;

pub const PAGES: &str = "pages";
pub const SECTIONS: &str = "sections";
pub const ITEMS: &str = "items";
pub const THEME: &str = "theme";

/// Tag of a single public page.
pub fn page_tag(slug: &str) -> String { format!("page:{slug}") }

/// A rendered response body.
#[derive(Debug, Clone)]
pub struct Cached {
  pub content_type: &'static str,
  pub body:         Bytes,
}

impl IntoResponse for Cached {
  fn into_response(self) -> Response {
    ([(header::CONTENT_TYPE, self.content_type)], self.body).into_response()
  }
}

#[derive(Debug, Clone)]
struct Entry {
  value: Cached,
  tags:  Vec<String>,
}

/// The tag generations observed before a store read.
#[derive(Debug, Clone)]
pub struct Ticket {
  tags: Vec<String>,
  seen: Vec<u64>,
}

#[derive(Debug, Default)]
pub struct TagCache {
  entries:     DashMap<String, Entry>,
  generations: DashMap<String, u64>,
}

impl TagCache {
  pub fn new() -> Self { Self::default() }

  pub fn get(&self, key: &str) -> Option<Cached> {
    self.entries.get(key).map(|entry| entry.value.clone())
  }

  fn generation(&self, tag: &str) -> u64 { self.generations.get(tag).map_or(0, |g| *g) }

  /// Take before reading the rows an entry will be built from.
  pub fn ticket(&self, tags: Vec<String>) -> Ticket {
    let seen = tags.iter().map(|t| self.generation(t)).collect();
    Ticket { tags, seen }
  }

  fn is_current(&self, ticket: &Ticket) -> bool {
    ticket
      .tags
      .iter()
      .zip(&ticket.seen)
      .all(|(tag, seen)| self.generation(tag) == *seen)
  }

  /// Store `value` unless one of the ticket's tags was invalidated since
  /// the ticket was taken. Returns whether the entry was kept.
  pub fn insert(&self, key: impl Into<String>, value: Cached, ticket: Ticket) -> bool {
    if !self.is_current(&ticket) {
      return false;
    }
    let key = key.into();
    self.entries.insert(key.clone(), Entry { value, tags: ticket.tags.clone() });
    // An invalidation that bumped between the two checks may have swept
    // before the entry landed.
    let current = self.is_current(&ticket);
    if !current {
      self.entries.remove(&key);
    }
    current
  }

  /// Drop every entry tagged with `tag`; returns how many were dropped.
  pub fn invalidate(&self, tag: &str) -> usize {
    *self.generations.entry(tag.to_owned()).or_insert(0) += 1;
    let before = self.entries.len();
    self.entries.retain(|_, entry| !entry.tags.iter().any(|t| t == tag));
    let dropped = before.saturating_sub(self.entries.len());
    if dropped > 0 {
      tracing::debug!(tag, dropped, "cache invalidated");
    }
    dropped
  }

  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}
