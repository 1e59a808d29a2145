//! The typed report view.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::extract::{field, records, root, strings, text, text_of};

/// Section keys in display order, as used in [`ReportView::missing_sections`].
pub const SECTIONS: [&str; 11] = [
  "overview",
  "market",
  "audience",
  "pain_points",
  "competitors",
  "opportunities",
  "keywords",
  "content_ideas",
  "monetization",
  "risks",
  "recommendations",
];

/// Source field names accepted for each entry of [`SECTIONS`].
const SECTION_ALIASES: [&[&str]; 11] = [
  &["overview", "executive_summary", "summary_section"],
  &["market", "market_analysis", "market_overview"],
  &["audience", "target_audience", "audience_segments"],
  &["pain_points", "painpoints", "problems"],
  &["competitors", "competition", "competitive_landscape"],
  &["opportunities", "gaps"],
  &["keywords", "keyword_research", "seo_keywords"],
  &["content_ideas", "ideas", "content"],
  &["monetization", "revenue_models", "monetization_strategies"],
  &["risks", "threats"],
  &["recommendations", "next_steps", "action_items"],
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
  pub title:        String,
  pub niche:        String,
  pub summary:      String,
  pub generated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Market {
  pub size:        String,
  pub growth_rate: String,
  pub maturity:    String,
  pub trends:      Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
  pub name:        String,
  pub description: String,
  pub size:        String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Competitor {
  pub name:        String,
  pub positioning: String,
  pub strengths:   Vec<String>,
  pub weaknesses:  Vec<String>,
  pub pricing:     String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Opportunity {
  pub title:       String,
  pub description: String,
  pub score:       String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Keyword {
  pub keyword:        String,
  pub monthly_volume: String,
  pub difficulty:     String,
  pub intent:         String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Monetization {
  pub model:       String,
  pub description: String,
  pub potential:   String,
}

/// A report body read into its fixed sections.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportView {
  pub overview:         Overview,
  pub market:           Market,
  pub audience:         Vec<Segment>,
  pub pain_points:      Vec<String>,
  pub competitors:      Vec<Competitor>,
  pub opportunities:    Vec<Opportunity>,
  pub keywords:         Vec<Keyword>,
  pub content_ideas:    Vec<String>,
  pub monetization:     Vec<Monetization>,
  pub risks:            Vec<String>,
  pub recommendations:  Vec<String>,
  /// Keys from [`SECTIONS`] whose source field was absent from the body.
  pub missing_sections: Vec<&'static str>,
}

/// Read `body` into a [`ReportView`]. Never fails: a body that is not an
/// object yields a view with every section missing.
pub fn build_view(body: &Value) -> ReportView {
  let empty = Map::new();
  let map = root(body).unwrap_or(&empty);
  let section = move |i: usize| field(map, SECTION_ALIASES[i]);

  let missing_sections = SECTIONS
    .iter()
    .enumerate()
    .filter(|(i, _)| section(*i).is_none())
    .map(|(_, key)| *key)
    .collect();

  ReportView {
    overview: overview(map, section(0)),
    market: market(section(1)),
    audience: records(section(2), "name", &["segments"])
      .iter()
      .map(|r| Segment {
        name:        text_of(r, &["name", "segment", "title"]),
        description: text_of(r, &["description", "details", "summary"]),
        size:        text_of(r, &["size", "estimated_size", "population"]),
      })
      .collect(),
    pain_points: strings(section(3)),
    competitors: records(section(4), "name", &["competitors", "list"])
      .iter()
      .map(|r| Competitor {
        name:        text_of(r, &["name", "competitor", "title"]),
        positioning: text_of(r, &["positioning", "position", "description"]),
        strengths:   strings(field(r, &["strengths", "pros"])),
        weaknesses:  strings(field(r, &["weaknesses", "cons"])),
        pricing:     text_of(r, &["pricing", "price", "price_range"]),
      })
      .collect(),
    opportunities: records(section(5), "title", &["opportunities", "list"])
      .iter()
      .map(|r| Opportunity {
        title:       text_of(r, &["title", "name", "opportunity"]),
        description: text_of(r, &["description", "details", "summary"]),
        score:       text_of(r, &["score", "rating", "priority"]),
      })
      .collect(),
    keywords: records(section(6), "keyword", &["keywords", "list"])
      .iter()
      .map(|r| Keyword {
        keyword:        text_of(r, &["keyword", "term", "query"]),
        monthly_volume: text_of(r, &["monthly_volume", "volume", "search_volume"]),
        difficulty:     text_of(r, &["difficulty", "kd", "competition"]),
        intent:         text_of(r, &["intent", "search_intent"]),
      })
      .collect(),
    content_ideas: strings(section(7)),
    monetization: records(section(8), "model", &["models", "strategies"])
      .iter()
      .map(|r| Monetization {
        model:       text_of(r, &["model", "name", "strategy"]),
        description: text_of(r, &["description", "details"]),
        potential:   text_of(r, &["potential", "revenue_potential", "estimate"]),
      })
      .collect(),
    risks: strings(section(9)),
    recommendations: strings(section(10)),
    missing_sections,
  }
}

fn overview(root: &Map<String, Value>, section: Option<&Value>) -> Overview {
  // Overview fields are often placed at the top level instead of nested.
  let source = match section {
    Some(Value::Object(map)) => map,
    _ => root,
  };
  let summary = match section {
    Some(s @ Value::String(_)) => text(Some(s)),
    _ => text_of(source, &["summary", "description", "text"]),
  };
  Overview {
    title: text_of(source, &["title", "name", "report_title"]),
    niche: text_of(source, &["niche", "topic", "subject"]),
    summary,
    generated_at: text_of(source, &["generated_at", "generated_date", "date", "created_at"]),
  }
}

fn market(section: Option<&Value>) -> Market {
  let empty = Map::new();
  let map = match section {
    Some(Value::Object(map)) => map,
    _ => &empty,
  };
  Market {
    size:        text_of(map, &["size", "market_size", "tam"]),
    growth_rate: text_of(map, &["growth_rate", "growth", "cagr"]),
    maturity:    text_of(map, &["maturity", "stage"]),
    trends:      strings(field(map, &["trends", "key_trends"])),
  }
}
