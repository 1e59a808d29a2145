//! Self-contained HTML dashboard for a [`ReportView`].

use std::fmt::Write as _;

use crate::{view::ReportView, MISSING};

const STYLE: &str = "
:root { color-scheme: light; --fg: #0f172a; --muted: #64748b; --line: #e2e8f0; --accent: #2563eb; }
* { box-sizing: border-box; }
body { margin: 0; font: 15px/1.5 system-ui, sans-serif; color: var(--fg); background: #f8fafc; }
main { max-width: 1100px; margin: 0 auto; padding: 32px 20px 64px; }
header h1 { margin: 0 0 4px; font-size: 28px; }
header p { margin: 0; color: var(--muted); }
section { background: #fff; border: 1px solid var(--line); border-radius: 10px; padding: 20px; margin-top: 20px; }
section h2 { margin: 0 0 12px; font-size: 18px; }
.stats { display: grid; grid-template-columns: repeat(auto-fit, minmax(180px, 1fr)); gap: 12px; }
.stat { border: 1px solid var(--line); border-radius: 8px; padding: 12px; }
.stat span { display: block; color: var(--muted); font-size: 12px; text-transform: uppercase; }
.stat strong { font-size: 18px; }
table { width: 100%; border-collapse: collapse; }
th, td { text-align: left; padding: 8px; border-bottom: 1px solid var(--line); vertical-align: top; }
th { color: var(--muted); font-weight: 600; font-size: 13px; }
ul { margin: 0; padding-left: 20px; }
.empty { color: var(--muted); font-style: italic; }
.missing { margin-top: 20px; color: var(--muted); font-size: 13px; }
";

/// Escape text for use in HTML element content and quoted attributes.
pub fn escape(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  for c in text.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#39;"),
      c => out.push(c),
    }
  }
  out
}

/// Render the full dashboard page.
pub fn render_html(view: &ReportView) -> String {
  let mut out = String::new();
  let title = if view.overview.title == MISSING {
    "Research report"
  } else {
    view.overview.title.as_str()
  };

  // Writing into a String cannot fail.
  let _ = write!(
    out,
    "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
     <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
     <title>{}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n<main>\n",
    escape(title),
  );

  let _ = write!(
    out,
    "<header><h1>{}</h1><p>{} · generated {}</p></header>\n",
    escape(title),
    escape(&view.overview.niche),
    escape(&view.overview.generated_at),
  );

  open(&mut out, "Overview");
  let _ = write!(out, "<p>{}</p>", escape(&view.overview.summary));
  close(&mut out);

  open(&mut out, "Market");
  out.push_str("<div class=\"stats\">");
  stat(&mut out, "Size", &view.market.size);
  stat(&mut out, "Growth rate", &view.market.growth_rate);
  stat(&mut out, "Maturity", &view.market.maturity);
  out.push_str("</div>");
  if !view.market.trends.is_empty() {
    out.push_str("<h3>Trends</h3>");
    list(&mut out, &view.market.trends);
  }
  close(&mut out);

  open(&mut out, "Audience");
  table(
    &mut out,
    &["Segment", "Description", "Size"],
    view
      .audience
      .iter()
      .map(|s| vec![escape(&s.name), escape(&s.description), escape(&s.size)]),
  );
  close(&mut out);

  open(&mut out, "Pain points");
  list(&mut out, &view.pain_points);
  close(&mut out);

  open(&mut out, "Competitors");
  table(
    &mut out,
    &["Name", "Positioning", "Strengths", "Weaknesses", "Pricing"],
    view.competitors.iter().map(|c| {
      vec![
        escape(&c.name),
        escape(&c.positioning),
        inline_list(&c.strengths),
        inline_list(&c.weaknesses),
        escape(&c.pricing),
      ]
    }),
  );
  close(&mut out);

  open(&mut out, "Opportunities");
  table(
    &mut out,
    &["Opportunity", "Description", "Score"],
    view
      .opportunities
      .iter()
      .map(|o| vec![escape(&o.title), escape(&o.description), escape(&o.score)]),
  );
  close(&mut out);

  open(&mut out, "Keywords");
  table(
    &mut out,
    &["Keyword", "Monthly volume", "Difficulty", "Intent"],
    view.keywords.iter().map(|k| {
      vec![
        escape(&k.keyword),
        escape(&k.monthly_volume),
        escape(&k.difficulty),
        escape(&k.intent),
      ]
    }),
  );
  close(&mut out);

  open(&mut out, "Content ideas");
  list(&mut out, &view.content_ideas);
  close(&mut out);

  open(&mut out, "Monetization");
  table(
    &mut out,
    &["Model", "Description", "Potential"],
    view
      .monetization
      .iter()
      .map(|m| vec![escape(&m.model), escape(&m.description), escape(&m.potential)]),
  );
  close(&mut out);

  open(&mut out, "Risks");
  list(&mut out, &view.risks);
  close(&mut out);

  open(&mut out, "Recommendations");
  list(&mut out, &view.recommendations);
  close(&mut out);

  if !view.missing_sections.is_empty() {
    let _ = write!(
      out,
      "<p class=\"missing\">Not in source: {}</p>\n",
      escape(&view.missing_sections.join(", ")),
    );
  }

  out.push_str("</main>\n</body>\n</html>\n");
  out
}

fn open(out: &mut String, heading: &str) {
  let _ = write!(out, "<section><h2>{}</h2>", escape(heading));
}

fn close(out: &mut String) { out.push_str("</section>\n"); }

fn stat(out: &mut String, label: &str, value: &str) {
  let _ = write!(
    out,
    "<div class=\"stat\"><span>{}</span><strong>{}</strong></div>",
    escape(label),
    escape(value),
  );
}

fn list(out: &mut String, entries: &[String]) {
  if entries.is_empty() {
    out.push_str("<p class=\"empty\">None listed.</p>");
    return;
  }
  out.push_str("<ul>");
  for entry in entries {
    let _ = write!(out, "<li>{}</li>", escape(entry));
  }
  out.push_str("</ul>");
}

fn inline_list(entries: &[String]) -> String {
  if entries.is_empty() {
    MISSING.to_owned()
  } else {
    escape(&entries.join(", "))
  }
}

/// Cells must already be escaped.
fn table(out: &mut String, headings: &[&str], rows: impl Iterator<Item = Vec<String>>) {
  let mut body = String::new();
  for row in rows {
    body.push_str("<tr>");
    for cell in row {
      let _ = write!(body, "<td>{cell}</td>");
    }
    body.push_str("</tr>");
  }
  if body.is_empty() {
    out.push_str("<p class=\"empty\">None listed.</p>");
    return;
  }
  out.push_str("<table><thead><tr>");
  for heading in headings {
    let _ = write!(out, "<th>{}</th>", escape(heading));
  }
  let _ = write!(out, "</tr></thead><tbody>{body}</tbody></table>");
}
