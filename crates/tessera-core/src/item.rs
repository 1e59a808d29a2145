//! Content items (FAQs, testimonials, features, CTAs, timeline entries and
//! media) that sections collect.
//!
//! Every kind shares one table: the [`ItemKind`] discriminant, a unique
//! per-kind `label` and the JSON payload of its [`ItemValue`] variant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{
  media::{normalize_avatar_url, resolve_media_url},
  Error, Result,
};

// ─── Kind ────────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ItemKind {
  Faq,
  Testimonial,
  Feature,
  Cta,
  Timeline,
  Media,
}

impl ItemKind {
  /// The discriminant stored in the `kind` column.
  pub fn as_str(self) -> &'static str { self.into() }

  /// The collection segment under `/api/admin`.
  pub fn collection(self) -> &'static str {
    match self {
      Self::Faq => "faqs",
      Self::Testimonial => "testimonials",
      Self::Feature => "features",
      Self::Cta => "ctas",
      Self::Timeline => "timeline",
      Self::Media => "media",
    }
  }

  /// Name of the field that carries the item's unique label.
  pub fn label_field(self) -> &'static str {
    match self {
      Self::Faq => "question",
      Self::Testimonial | Self::Media => "name",
      Self::Feature | Self::Timeline => "title",
      Self::Cta => "label",
    }
  }
}

// ─── Values ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqValue {
  pub question: String,
  pub answer:   String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestimonialValue {
  /// Author's name.
  pub name:       String,
  pub quote:      String,
  pub role:       Option<String>,
  pub company:    Option<String>,
  pub avatar_url: Option<String>,
  /// 1–5 stars.
  pub rating:     Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureValue {
  pub title:       String,
  pub description: Option<String>,
  /// Icon identifier understood by the front end.
  pub icon:        Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CtaValue {
  pub label:   String,
  pub url:     String,
  /// Button style, e.g. `primary` or `outline`.
  pub variant: Option<String>,
  #[serde(default)]
  pub new_tab: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineValue {
  pub title:       String,
  pub description: Option<String>,
  /// Display text such as `Q3 2024`; not parsed.
  pub date_label:  Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaValue {
  pub name:       String,
  pub url:        String,
  pub alt:        Option<String>,
  /// MIME type, e.g. `image/webp`.
  pub media_type: Option<String>,
  pub width:      Option<u32>,
  pub height:     Option<u32>,
}

/// The typed payload of an item. The variant name is the `kind`
/// discriminant stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ItemValue {
  Faq(FaqValue),
  Testimonial(TestimonialValue),
  Feature(FeatureValue),
  Cta(CtaValue),
  Timeline(TimelineValue),
  Media(MediaValue),
}

impl ItemValue {
  pub fn kind(&self) -> ItemKind {
    match self {
      Self::Faq(_) => ItemKind::Faq,
      Self::Testimonial(_) => ItemKind::Testimonial,
      Self::Feature(_) => ItemKind::Feature,
      Self::Cta(_) => ItemKind::Cta,
      Self::Timeline(_) => ItemKind::Timeline,
      Self::Media(_) => ItemKind::Media,
    }
  }

  /// The unique human-readable text of the item.
  pub fn label(&self) -> &str {
    match self {
      Self::Faq(v) => &v.question,
      Self::Testimonial(v) => &v.name,
      Self::Feature(v) => &v.title,
      Self::Cta(v) => &v.label,
      Self::Timeline(v) => &v.title,
      Self::Media(v) => &v.name,
    }
  }

  /// Replace the label, e.g. when cloning under a suffixed name.
  pub fn set_label(&mut self, label: String) {
    match self {
      Self::Faq(v) => v.question = label,
      Self::Testimonial(v) => v.name = label,
      Self::Feature(v) => v.title = label,
      Self::Cta(v) => v.label = label,
      Self::Timeline(v) => v.title = label,
      Self::Media(v) => v.name = label,
    }
  }

  /// Apply URL normalization: avatars gain a scheme, relative media paths
  /// resolve against the CDN pull zone.
  pub fn normalize(&mut self, pull_zone: Option<&str>) {
    match self {
      Self::Testimonial(v) => {
        v.avatar_url = normalize_avatar_url(v.avatar_url.as_deref());
      }
      Self::Media(v) => {
        if let Some(url) = resolve_media_url(Some(&v.url), pull_zone) {
          v.url = url;
        }
      }
      _ => {}
    }
  }

  /// Serialise the inner payload (without the kind tag) for the
  /// `value_json` column.
  pub fn to_json(&self) -> Result<serde_json::Value> {
    let full = serde_json::to_value(self)?;
    Ok(full.get("value").cloned().unwrap_or(serde_json::Value::Null))
  }

  /// Deserialise from a kind and its bare JSON payload.
  pub fn from_parts(kind: ItemKind, value: serde_json::Value) -> Result<Self> {
    let wrapped = serde_json::json!({ "kind": kind.as_str(), "value": value });
    Ok(serde_json::from_value(wrapped)?)
  }

  /// Same as [`Self::from_parts`] with the discriminant as stored text.
  pub fn from_stored(kind: &str, value: serde_json::Value) -> Result<Self> {
    let kind = kind
      .parse::<ItemKind>()
      .map_err(|_| Error::UnknownItemKind(kind.to_owned()))?;
    Self::from_parts(kind, value)
  }
}

// ─── Item ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
  pub item_id:    Uuid,
  #[serde(flatten)]
  pub value:      ItemValue,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
