//! Unique names for duplicated rows.
//!
//! A duplicate keeps the *lineage base* of its source (the name with any
//! counter suffix stripped) and appends a counter one higher than every
//! counter already used in that lineage. Counters start at 2; the undecorated
//! base counts as 1.

/// How a counter is appended to a lineage base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuffixStyle {
  /// `Hero V2`
  Version,
  /// `What is it? (Copy 2)`
  Copy,
  /// `landing-copy-2`
  Slug,
}

impl SuffixStyle {
  /// Append counter `n` to `base`.
  pub fn apply(self, base: &str, n: u32) -> String {
    match self {
      Self::Version => format!("{base} V{n}"),
      Self::Copy => format!("{base} (Copy {n})"),
      Self::Slug => format!("{base}-copy-{n}"),
    }
  }

  /// Split `name` into its lineage base and counter, if it carries a suffix
  /// of this style.
  pub fn split(self, name: &str) -> (&str, Option<u32>) {
    let parsed = match self {
      Self::Version => name
        .rsplit_once(" V")
        .and_then(|(base, n)| parse_counter(n).map(|n| (base, n))),
      Self::Copy => name
        .strip_suffix(')')
        .and_then(|rest| rest.rsplit_once(" (Copy "))
        .and_then(|(base, n)| parse_counter(n).map(|n| (base, n))),
      Self::Slug => name
        .rsplit_once("-copy-")
        .and_then(|(base, n)| parse_counter(n).map(|n| (base, n))),
    };
    match parsed {
      Some((base, n)) => (base, Some(n)),
      None => (name, None),
    }
  }
}

fn parse_counter(s: &str) -> Option<u32> {
  if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  }
  s.parse().ok()
}

/// Strip a trailing ` VN` or ` (Copy N)` from a human-readable label, or a
/// `-copy-N` from a slug when `style` is [`SuffixStyle::Slug`].
pub fn lineage_base(name: &str, style: SuffixStyle) -> &str {
  let name = name.trim_end();
  match style {
    SuffixStyle::Slug => SuffixStyle::Slug.split(name).0,
    SuffixStyle::Version | SuffixStyle::Copy => {
      let (base, n) = SuffixStyle::Copy.split(name);
      if n.is_some() {
        base
      } else {
        SuffixStyle::Version.split(name).0
      }
    }
  }
}

/// Pick the name for a duplicate of `source`.
///
/// `existing` must contain every name currently in use that starts with the
/// lineage base; names from other lineages are ignored. The result is never
/// an element of `existing`.
pub fn next_duplicate_name<'a>(
  source: &str,
  style: SuffixStyle,
  existing: impl IntoIterator<Item = &'a str>,
) -> String {
  let base = lineage_base(source, style);
  let highest = existing
    .into_iter()
    .filter_map(|name| {
      if name == base {
        return Some(1);
      }
      match style.split(name) {
        (b, Some(n)) if b == base => Some(n),
        _ => None,
      }
    })
    .max()
    .unwrap_or(1);
  style.apply(base, highest.saturating_add(1).max(2))
}
