//! Pages: the routable documents of the public site.
//!
//! A page owns no content of its own beyond metadata; it is an ordered list
//! of [`Section`] references held in the `page_sections` junction, where each
//! link carries its own position and status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{section::Section, status::PublishStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
  pub page_id:     Uuid,
  pub title:       String,
  /// URL path segment; unique across pages.
  pub slug:        String,
  pub description: Option<String>,
  pub status:      PublishStatus,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

/// Input to [`crate::store::ContentStore::create_page`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewPage {
  pub title:       String,
  /// Derived from `title` when omitted.
  pub slug:        Option<String>,
  pub description: Option<String>,
  #[serde(default)]
  pub status:      PublishStatus,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageUpdate {
  pub title:       Option<String>,
  pub slug:        Option<String>,
  pub description: Option<String>,
  pub status:      Option<PublishStatus>,
}

/// A section as placed on a page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSection {
  pub page_id:  Uuid,
  pub position: i64,
  /// Status of the link itself, independent of the section's own status.
  pub status:   PublishStatus,
  pub section:  Section,
}

/// One entry of a bulk reorder: the list order becomes the position.
#[derive(Debug, Clone, Deserialize)]
pub struct SectionLinkInput {
  pub section_id: Uuid,
  #[serde(default)]
  pub status:     PublishStatus,
}

/// A page together with its ordered section links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageDetail {
  #[serde(flatten)]
  pub page:     Page,
  pub sections: Vec<PageSection>,
}

/// Lowercase ASCII slug: alphanumerics kept, every other run collapsed to a
/// single `-`, no leading or trailing dash.
pub fn slugify(title: &str) -> String {
  let mut slug = String::with_capacity(title.len());
  for c in title.chars() {
    if c.is_ascii_alphanumeric() {
      slug.push(c.to_ascii_lowercase());
    } else if !slug.is_empty() && !slug.ends_with('-') {
      slug.push('-');
    }
  }
  while slug.ends_with('-') {
    slug.pop();
  }
  slug
}

/// Whether `slug` is already in canonical form.
pub fn is_valid_slug(slug: &str) -> bool {
  !slug.is_empty() && slugify(slug) == slug
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn slugify_collapses_punctuation() {
    assert_eq!(slugify("Free Trial — Spring 2025!"), "free-trial-spring-2025");
    assert_eq!(slugify("  --Hello--World--  "), "hello-world");
    assert_eq!(slugify("???"), "");
  }

  #[test]
  fn valid_slugs() {
    assert!(is_valid_slug("landing-copy-2"));
    assert!(!is_valid_slug("Landing"));
    assert!(!is_valid_slug("a--b"));
    assert!(!is_valid_slug(""));
  }
}
