//! Site theme: named color tokens stored as HSL and served as hex.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{color::Hsl, Error, Result};

/// Key of the theme row in the settings table.
pub const THEME_SETTING: &str = "theme";

/// Named HSL color tokens, e.g. `primary`, `background`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
  pub tokens: BTreeMap<String, Hsl>,
}

impl Default for Theme {
  fn default() -> Self {
    let tokens = [
      ("background", Hsl { h: 0.0, s: 0.0, l: 100.0 }),
      ("foreground", Hsl { h: 222.2, s: 84.0, l: 4.9 }),
      ("primary", Hsl { h: 222.2, s: 47.4, l: 11.2 }),
      ("secondary", Hsl { h: 210.0, s: 40.0, l: 96.1 }),
      ("accent", Hsl { h: 210.0, s: 40.0, l: 96.1 }),
      ("muted", Hsl { h: 210.0, s: 40.0, l: 96.1 }),
    ]
    .into_iter()
    .map(|(name, hsl)| (name.to_owned(), hsl))
    .collect();
    Self { tokens }
  }
}

/// A token with its computed hex value, as returned to editors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeToken {
  pub hsl: Hsl,
  pub hex: String,
}

impl Theme {
  /// Token names must be non-empty lowercase ASCII, digits and dashes; every
  /// color must be in range.
  pub fn validate(&self) -> Result<()> {
    for (name, hsl) in &self.tokens {
      let valid_name = !name.is_empty()
        && name
          .bytes()
          .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
      if !valid_name {
        return Err(Error::InvalidToken(name.clone()));
      }
      hsl.validate()?;
    }
    Ok(())
  }

  pub fn resolved(&self) -> Result<BTreeMap<String, ThemeToken>> {
    self
      .tokens
      .iter()
      .map(|(name, hsl)| {
        Ok((name.clone(), ThemeToken { hsl: *hsl, hex: hsl.to_hex()? }))
      })
      .collect()
  }

  /// A `:root` block with one hex custom property per token, plus the raw
  /// HSL triple under `--{name}-hsl`.
  pub fn to_css(&self) -> Result<String> {
    let mut css = String::from(":root {\n");
    for (name, token) in self.resolved()? {
      css.push_str(&format!("  --{name}: {};\n", token.hex));
      css.push_str(&format!("  --{name}-hsl: {};\n", token.hsl));
    }
    css.push_str("}\n");
    Ok(css)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_theme_is_valid_and_renders() {
    let theme = Theme::default();
    theme.validate().unwrap();
    let css = theme.to_css().unwrap();
    assert!(css.starts_with(":root {"));
    assert!(css.contains("  --background: #ffffff;\n"));
    assert!(css.contains("  --primary-hsl: 222.2 47.4% 11.2%;\n"));
  }

  #[test]
  fn bad_token_names_are_rejected() {
    let mut theme = Theme::default();
    theme.tokens.insert("Primary Color".into(), Hsl { h: 0.0, s: 0.0, l: 0.0 });
    assert!(theme.validate().is_err());
  }
}
