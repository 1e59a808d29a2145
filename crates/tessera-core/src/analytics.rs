//! Analytics events (an append-only ledger of clicks and views) and the
//! aggregate shapes computed over it.

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Events ──────────────────────────────────────────────────────────────────

/// An immutable analytics record. Never updated, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsEvent {
  pub event_id:    Uuid,
  /// e.g. `page_view`, `cta_click`.
  pub event_type:  String,
  /// What was interacted with, e.g. `cta` or `page`.
  pub entity_type: Option<String>,
  pub entity_id:   Option<String>,
  pub session_id:  Option<String>,
  pub page_path:   Option<String>,
  pub country:     Option<String>,
  pub city:        Option<String>,
  pub metadata:    serde_json::Value,
  /// Server-assigned.
  pub created_at:  DateTime<Utc>,
}

/// Input to [`crate::store::AnalyticsStore::record_event`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
  pub event_type:  String,
  pub entity_type: Option<String>,
  pub entity_id:   Option<String>,
  pub session_id:  Option<String>,
  pub page_path:   Option<String>,
  pub country:     Option<String>,
  pub city:        Option<String>,
  #[serde(default)]
  pub metadata:    serde_json::Value,
}

// ─── Scope ───────────────────────────────────────────────────────────────────

/// The time window of an analytics query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Scope {
  /// The trailing `n` days up to now.
  Days(u32),
  #[default]
  All,
}

impl Scope {
  /// The lower bound on `created_at`, or `None` for an unbounded scope.
  /// A window reaching past the representable range is unbounded.
  pub fn since(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match self {
      Self::Days(n) => now.checked_sub_signed(TimeDelta::try_days(i64::from(n))?),
      Self::All => None,
    }
  }
}

impl FromStr for Scope {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("all") {
      return Ok(Self::All);
    }
    match s.trim_end_matches('d').parse::<u32>() {
      Ok(n) if n > 0 => Ok(Self::Days(n)),
      _ => Err(format!("invalid scope {s:?}: expected a positive day count or \"all\"")),
    }
  }
}

impl TryFrom<String> for Scope {
  type Error = String;

  fn try_from(s: String) -> Result<Self, Self::Error> { s.parse() }
}

impl From<Scope> for String {
  fn from(scope: Scope) -> Self { scope.to_string() }
}

impl fmt::Display for Scope {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Days(n) => write!(f, "{n}"),
      Self::All => f.write_str("all"),
    }
  }
}

// ─── Queries ─────────────────────────────────────────────────────────────────

/// Parameters for [`crate::store::AnalyticsStore::list_events`].
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
  pub since:       Option<DateTime<Utc>>,
  pub event_type:  Option<String>,
  pub entity_type: Option<String>,
  pub entity_id:   Option<String>,
  pub limit:       Option<usize>,
  pub offset:      Option<usize>,
}

// ─── Aggregates ──────────────────────────────────────────────────────────────

/// Events on one UTC calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCount {
  pub day:   NaiveDate,
  pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCount {
  /// `None` groups events where the key was not recorded.
  pub key:   Option<String>,
  pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationCount {
  pub country: Option<String>,
  pub city:    Option<String>,
  pub count:   u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCount {
  pub entity_type: Option<String>,
  pub entity_id:   Option<String>,
  pub count:       u64,
}

/// Aggregates over all events recorded at or after `since`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsSummary {
  pub since:           Option<DateTime<Utc>>,
  pub total_events:    u64,
  pub unique_sessions: u64,
  /// Ascending by day; days without events are absent.
  pub by_day:          Vec<DayCount>,
  /// Descending by count.
  pub by_country:      Vec<KeyCount>,
  pub by_location:     Vec<LocationCount>,
  pub by_event_type:   Vec<KeyCount>,
}

// ─── Ingestion filter ────────────────────────────────────────────────────────

/// Whether events from `host` (a `Host` header value) should be dropped.
///
/// Loopback names and addresses, `*.localhost`, `*.local` and any host listed
/// in `extra` (compared without port, case-insensitively) count as dev hosts.
pub fn is_dev_host(host: &str, extra: &[String]) -> bool {
  let host = host.trim().to_ascii_lowercase();
  let name = if let Some(rest) = host.strip_prefix('[') {
    rest.split(']').next().unwrap_or_default()
  } else {
    host.rsplit_once(':').map_or(host.as_str(), |(name, port)| {
      if port.bytes().all(|b| b.is_ascii_digit()) { name } else { host.as_str() }
    })
  };

  matches!(name, "localhost" | "127.0.0.1" | "0.0.0.0" | "::1")
    || name.ends_with(".localhost")
    || name.ends_with(".local")
    || extra.iter().any(|h| h.trim().eq_ignore_ascii_case(name))
}
