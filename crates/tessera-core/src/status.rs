//! The three-state publication status shared by pages, sections and the
//! junction rows linking them.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Publication status. Set independently on pages, sections, page-section
/// links and section-item links; storage enforces no hierarchy between them.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PublishStatus {
  Published,
  #[default]
  Draft,
  Deactivated,
}

impl PublishStatus {
  pub fn is_published(self) -> bool { matches!(self, Self::Published) }

  pub fn as_str(self) -> &'static str { self.into() }
}

/// A partial update of a junction row (page-section or section-item link).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinkUpdate {
  pub position: Option<i64>,
  pub status:   Option<PublishStatus>,
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use super::*;

  #[test]
  fn string_forms_match_serde() {
    for status in [
      PublishStatus::Published,
      PublishStatus::Draft,
      PublishStatus::Deactivated,
    ] {
      let json = serde_json::to_string(&status).unwrap();
      assert_eq!(json, format!("\"{}\"", status.as_str()));
      assert_eq!(PublishStatus::from_str(status.as_str()).unwrap(), status);
    }
  }

  #[test]
  fn default_is_draft() {
    assert_eq!(PublishStatus::default(), PublishStatus::Draft);
  }
}
