//! Typed views and HTML dashboards for research reports.
//!
//! A report body is whatever JSON the generation workflow posted back. This
//! crate reads it into a fixed sequence of sections, tolerating absent or
//! oddly shaped fields: missing scalars read as [`MISSING`], missing lists as
//! empty. Nothing here can fail. Pure synchronous; no HTTP or database
//! dependencies.
//!
//! # Quick start
//!
//! ```
//! use serde_json::json;
//!
//! let view = tessera_report::build_view(&json!({
//!   "overview": { "title": "Pet insurance", "summary": "Growing fast." },
//!   "risks": ["Regulation"],
//! }));
//! assert_eq!(view.overview.title, "Pet insurance");
//! assert_eq!(view.overview.niche, tessera_report::MISSING);
//! assert!(view.missing_sections.contains(&"market"));
//!
//! let html = tessera_report::render_html(&view);
//! assert!(html.contains("Regulation"));
//! ```

mod extract;
mod html;
mod view;

pub use html::{escape, render_html};
pub use view::{
  build_view, Competitor, Keyword, Market, Monetization, Opportunity, Overview,
  ReportView, Segment, SECTIONS,
};

/// What an absent scalar renders as.
pub const MISSING: &str = "—";
