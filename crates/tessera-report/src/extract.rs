//! Lenient field access over arbitrary JSON.

use serde_json::{Map, Value};

use crate::MISSING;

/// Keys that commonly wrap the real payload of a workflow response.
const ENVELOPES: &[&str] = &["report", "data", "output", "result"];

/// Keys tried, in order, when a list element is an object but a plain text
/// entry is expected.
const TEXT_KEYS: &[&str] = &[
  "title",
  "name",
  "text",
  "idea",
  "point",
  "risk",
  "recommendation",
  "description",
];

/// Peel envelopes off a report body until the object holding the sections
/// is reached. Arrays resolve to their first element.
pub fn root(body: &Value) -> Option<&Map<String, Value>> {
  let mut current = body;
  loop {
    match current {
      Value::Array(items) => current = items.first()?,
      Value::Object(map) => {
        let wrapped = (map.len() == 1)
          .then(|| ENVELOPES.iter().find_map(|key| map.get(*key)))
          .flatten()
          .filter(|inner| inner.is_object() || inner.is_array());
        match wrapped {
          Some(inner) => current = inner,
          None => return Some(map),
        }
      }
      _ => return None,
    }
  }
}

/// The first non-null value under any of `aliases`.
pub fn field<'a>(map: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
  aliases
    .iter()
    .filter_map(|key| map.get(*key))
    .find(|v| !v.is_null())
}

/// Render a scalar as display text.
///
/// Strings are trimmed, numbers and booleans are printed, arrays of scalars
/// are joined with commas. Anything else, including empty strings, is
/// [`MISSING`].
pub fn text(value: Option<&Value>) -> String {
  match value {
    Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_owned(),
    Some(Value::Number(n)) => n.to_string(),
    Some(Value::Bool(b)) => b.to_string(),
    Some(Value::Array(items)) => {
      let parts: Vec<String> = items
        .iter()
        .map(|item| text(Some(item)))
        .filter(|s| s != MISSING)
        .collect();
      if parts.is_empty() { MISSING.to_owned() } else { parts.join(", ") }
    }
    _ => MISSING.to_owned(),
  }
}

/// Shorthand for `text(field(map, aliases))`.
pub fn text_of(map: &Map<String, Value>, aliases: &[&str]) -> String {
  text(field(map, aliases))
}

/// Read a list of plain entries.
///
/// A single string is a one-entry list. Object entries contribute their first
/// textual field. Entries that yield nothing are dropped.
pub fn strings(value: Option<&Value>) -> Vec<String> {
  let entry = |item: &Value| -> Option<String> {
    let rendered = match item {
      Value::Object(map) => text_of(map, TEXT_KEYS),
      other => text(Some(other)),
    };
    (rendered != MISSING).then_some(rendered)
  };
  match value {
    Some(Value::Array(items)) => items.iter().filter_map(entry).collect(),
    Some(item @ (Value::String(_) | Value::Number(_) | Value::Object(_))) => {
      entry(item).into_iter().collect()
    }
    _ => Vec::new(),
  }
}

/// Read a list of records.
///
/// Object entries are used as they are. A bare scalar entry becomes a record
/// whose `primary` field holds it. `container_keys` lets a section be given
/// as an object wrapping the list (e.g. `{"segments": [...]}`).
pub fn records(
  value: Option<&Value>,
  primary: &str,
  container_keys: &[&str],
) -> Vec<Map<String, Value>> {
  let items: &[Value] = match value {
    Some(Value::Array(items)) => items,
    Some(Value::Object(map)) => match field(map, container_keys) {
      Some(Value::Array(items)) => items,
      _ => return vec![map.clone()],
    },
    Some(scalar @ (Value::String(_) | Value::Number(_))) => {
      return vec![Map::from_iter([(primary.to_owned(), scalar.clone())])];
    }
    _ => return Vec::new(),
  };
  items
    .iter()
    .filter_map(|item| match item {
      Value::Object(map) => Some(map.clone()),
      Value::String(_) | Value::Number(_) => {
        Some(Map::from_iter([(primary.to_owned(), item.clone())]))
      }
      _ => None,
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn root_unwraps_envelopes_and_arrays() {
    let body = json!([{ "output": { "overview": {} } }]);
    let map = root(&body).unwrap();
    assert!(map.contains_key("overview"));

    // A lone `data` key holding a scalar is content, not an envelope.
    let body = json!({ "data": "x" });
    assert!(root(&body).unwrap().contains_key("data"));

    assert!(root(&json!(42)).is_none());
  }

  #[test]
  fn text_renders_scalars() {
    assert_eq!(text(Some(&json!("  hi "))), "hi");
    assert_eq!(text(Some(&json!(3.5))), "3.5");
    assert_eq!(text(Some(&json!(true))), "true");
    assert_eq!(text(Some(&json!(["a", 1, null]))), "a, 1");
    assert_eq!(text(Some(&json!(""))), MISSING);
    assert_eq!(text(Some(&json!({ "a": 1 }))), MISSING);
    assert_eq!(text(None), MISSING);
  }

  #[test]
  fn field_skips_nulls() {
    let map = json!({ "a": null, "b": 2 });
    let map = map.as_object().unwrap();
    assert_eq!(field(map, &["a", "b"]), Some(&json!(2)));
    assert_eq!(field(map, &["c"]), None);
  }

  #[test]
  fn strings_accepts_mixed_entries() {
    let value = json!(["one", { "title": "two" }, { "other": 1 }, 4, null]);
    assert_eq!(strings(Some(&value)), vec!["one", "two", "4"]);
    assert_eq!(strings(Some(&json!("solo"))), vec!["solo"]);
    assert!(strings(Some(&json!(false))).is_empty());
  }

  #[test]
  fn records_accepts_wrapped_and_bare_lists() {
    let wrapped = json!({ "segments": [{ "name": "SMB" }, "Enterprise"] });
    let rows = records(Some(&wrapped), "name", &["segments"]);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1]["name"], json!("Enterprise"));

    let single = json!({ "name": "Only" });
    assert_eq!(records(Some(&single), "name", &["segments"]).len(), 1);
    assert!(records(None, "name", &[]).is_empty());
  }
}
