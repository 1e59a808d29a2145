//! HSL colors as stored in theme tokens, and their hex rendering.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A color in HSL space. `h` is in degrees, `s` and `l` are percentages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsl {
  pub h: f64,
  pub s: f64,
  pub l: f64,
}

impl Hsl {
  pub fn new(h: f64, s: f64, l: f64) -> Result<Self> {
    let hsl = Self { h, s, l };
    hsl.validate()?;
    Ok(hsl)
  }

  /// Reject non-finite components and saturation/lightness outside 0–100.
  /// Hue wraps, so any finite value is accepted.
  pub fn validate(&self) -> Result<()> {
    let in_pct = |v: f64| v.is_finite() && (0.0..=100.0).contains(&v);
    if !self.h.is_finite() || !in_pct(self.s) || !in_pct(self.l) {
      return Err(Error::HslOutOfRange { h: self.h, s: self.s, l: self.l });
    }
    Ok(())
  }

  /// `#rrggbb`, lowercase.
  pub fn to_hex(&self) -> Result<String> {
    hsl_to_hex(self.h, self.s, self.l)
  }
}

impl fmt::Display for Hsl {
  /// The space-separated form used in CSS custom properties: `222 47% 11%`.
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}% {}%", self.h, self.s, self.l)
  }
}

impl FromStr for Hsl {
  type Err = Error;

  /// Accepts `222 47% 11%`, `222, 47%, 11%` and `hsl(222 47% 11%)`.
  fn from_str(s: &str) -> Result<Self> {
    let bad = || Error::InvalidHsl(s.to_owned());
    let inner = s
      .trim()
      .strip_prefix("hsl(")
      .and_then(|rest| rest.strip_suffix(')'))
      .unwrap_or(s.trim());

    let parts: Vec<f64> = inner
      .split(|c: char| c == ',' || c.is_whitespace())
      .filter(|p| !p.is_empty())
      .map(|p| p.trim_end_matches('%').trim_end_matches("deg").parse::<f64>())
      .collect::<std::result::Result<_, _>>()
      .map_err(|_| bad())?;

    match parts.as_slice() {
      [h, s, l] => Self::new(*h, *s, *l),
      _ => Err(bad()),
    }
  }
}

/// Convert HSL (degrees, percent, percent) to a `#rrggbb` string.
pub fn hsl_to_hex(h: f64, s: f64, l: f64) -> Result<String> {
  Hsl { h, s, l }.validate()?;

  let h = h.rem_euclid(360.0);
  let s = s / 100.0;
  let l = l / 100.0;
  let a = s * l.min(1.0 - l);

  let channel = |n: f64| -> u8 {
    let k = (n + h / 30.0) % 12.0;
    let v = l - a * (k - 3.0).min(9.0 - k).min(1.0).max(-1.0);
    (v * 255.0).round().clamp(0.0, 255.0) as u8
  };

  Ok(format!(
    "#{:02x}{:02x}{:02x}",
    channel(0.0),
    channel(8.0),
    channel(4.0)
  ))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn black_and_white() {
    assert_eq!(hsl_to_hex(0.0, 0.0, 0.0).unwrap(), "#000000");
    assert_eq!(hsl_to_hex(0.0, 0.0, 100.0).unwrap(), "#ffffff");
  }

  #[test]
  fn primaries() {
    assert_eq!(hsl_to_hex(0.0, 100.0, 50.0).unwrap(), "#ff0000");
    assert_eq!(hsl_to_hex(120.0, 100.0, 50.0).unwrap(), "#00ff00");
    assert_eq!(hsl_to_hex(240.0, 100.0, 50.0).unwrap(), "#0000ff");
  }

  #[test]
  fn output_is_always_six_hex_digits() {
    let mut h = 0.0;
    while h < 360.0 {
      for s in [0.0, 13.5, 50.0, 100.0] {
        for l in [0.0, 7.0, 50.0, 93.0, 100.0] {
          let hex = hsl_to_hex(h, s, l).unwrap();
          assert_eq!(hex.len(), 7, "{hex}");
          assert!(hex.starts_with('#'));
          assert!(
            hex[1..].chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)),
            "{hex}"
          );
        }
      }
      h += 17.5;
    }
  }

  #[test]
  fn out_of_range_is_rejected() {
    assert!(hsl_to_hex(0.0, 101.0, 50.0).is_err());
    assert!(hsl_to_hex(0.0, 50.0, -1.0).is_err());
    assert!(hsl_to_hex(f64::NAN, 50.0, 50.0).is_err());
  }

  #[test]
  fn parses_css_forms() {
    let a: Hsl = "222.2 47.4% 11.2%".parse().unwrap();
    assert_eq!(a, Hsl { h: 222.2, s: 47.4, l: 11.2 });
    let b: Hsl = "hsl(210, 40%, 98%)".parse().unwrap();
    assert_eq!(b, Hsl { h: 210.0, s: 40.0, l: 98.0 });
    assert!("12 34".parse::<Hsl>().is_err());
  }
}
