//! Media and avatar URL normalization.

fn has_scheme(url: &str) -> bool {
  url.contains("://") || url.starts_with("data:") || url.starts_with("blob:")
}

/// Normalize an avatar URL as entered by an editor.
///
/// - empty or missing → `None`
/// - already absolute → unchanged
/// - scheme-less CDN host (anything containing `cdn`, e.g. `*.b-cdn.net`) →
///   `https://` prefixed
/// - anything else is returned trimmed, as a relative path
pub fn normalize_avatar_url(raw: Option<&str>) -> Option<String> {
  let url = raw?.trim();
  if url.is_empty() {
    return None;
  }
  if has_scheme(url) {
    return Some(url.to_owned());
  }
  if let Some(rest) = url.strip_prefix("//") {
    return Some(format!("https://{rest}"));
  }
  if url.contains("b-cdn.net") || url.contains("cdn") {
    return Some(format!("https://{url}"));
  }
  Some(url.to_owned())
}

/// Normalize like [`normalize_avatar_url`], then resolve a remaining relative
/// path against the CDN pull zone when one is configured.
pub fn resolve_media_url(raw: Option<&str>, pull_zone: Option<&str>) -> Option<String> {
  let url = normalize_avatar_url(raw)?;
  match pull_zone {
    Some(zone) if !has_scheme(&url) && !zone.trim().is_empty() => Some(format!(
      "{}/{}",
      zone.trim().trim_end_matches('/'),
      url.trim_start_matches('/')
    )),
    _ => Some(url),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn cdn_host_without_scheme_gains_https() {
    assert_eq!(
      normalize_avatar_url(Some("acme.b-cdn.net/avatars/jo.png")).as_deref(),
      Some("https://acme.b-cdn.net/avatars/jo.png")
    );
    assert_eq!(
      normalize_avatar_url(Some("cdn.example.com/a.jpg")).as_deref(),
      Some("https://cdn.example.com/a.jpg")
    );
  }

  #[test]
  fn absolute_urls_are_unchanged() {
    for url in [
      "https://acme.b-cdn.net/a.png",
      "http://cdn.example.com/a.png",
      "data:image/png;base64,AAAA",
    ] {
      assert_eq!(normalize_avatar_url(Some(url)).as_deref(), Some(url));
    }
  }

  #[test]
  fn empty_and_missing_are_none() {
    assert_eq!(normalize_avatar_url(None), None);
    assert_eq!(normalize_avatar_url(Some("")), None);
    assert_eq!(normalize_avatar_url(Some("   ")), None);
  }

  #[test]
  fn relative_paths_resolve_against_pull_zone() {
    assert_eq!(
      resolve_media_url(Some("/img/hero.webp"), Some("https://acme.b-cdn.net/"))
        .as_deref(),
      Some("https://acme.b-cdn.net/img/hero.webp")
    );
    assert_eq!(
      resolve_media_url(Some("img/hero.webp"), None).as_deref(),
      Some("img/hero.webp")
    );
    assert_eq!(
      resolve_media_url(Some("https://x.test/a.png"), Some("https://acme.b-cdn.net"))
        .as_deref(),
      Some("https://x.test/a.png")
    );
  }
}
