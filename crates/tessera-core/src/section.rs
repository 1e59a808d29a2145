//! Sections: typed, positionable content blocks placed on pages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{item::Item, status::PublishStatus};

/// What a section renders as on the public site. The front end picks a
/// component by this discriminant.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SectionKind {
  Hero,
  Faq,
  Testimonials,
  Features,
  Cta,
  Timeline,
  Media,
  Custom,
}

impl SectionKind {
  pub fn as_str(self) -> &'static str { self.into() }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
  pub section_id: Uuid,
  /// Editor-facing label; unique across sections.
  pub name:       String,
  pub kind:       SectionKind,
  /// Free-form block content (headline, copy, layout options…).
  pub content:    serde_json::Value,
  pub status:     PublishStatus,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Input to [`crate::store::ContentStore::create_section`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewSection {
  pub name:    String,
  pub kind:    SectionKind,
  #[serde(default = "empty_object")]
  pub content: serde_json::Value,
  #[serde(default)]
  pub status:  PublishStatus,
}

fn empty_object() -> serde_json::Value { serde_json::Value::Object(Default::default()) }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SectionUpdate {
  pub name:    Option<String>,
  pub kind:    Option<SectionKind>,
  pub content: Option<serde_json::Value>,
  pub status:  Option<PublishStatus>,
}

/// A content item as placed in a section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionItem {
  pub section_id: Uuid,
  pub position:   i64,
  pub status:     PublishStatus,
  pub item:       Item,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionDetail {
  #[serde(flatten)]
  pub section: Section,
  pub items:   Vec<SectionItem>,
}
