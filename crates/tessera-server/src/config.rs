//! Server configuration: an optional TOML file layered under `TESSERA_*`
//! environment variables.

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File, Source};
use serde::Deserialize;

/// Integration settings also read from their conventional variable names.
const BARE_ENV: &[(&str, &str)] = &[
  ("openrouter_key", "OPENROUTER_KEY"),
  ("bunny_pull_zone_url", "BUNNY_PULL_ZONE_URL"),
  ("rag_remove_document_webhook_url", "N8N_RAG_REMOVE_DOCUMENT_WEBHOOK_URL"),
];

/// Runtime server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:               String,
  #[serde(default = "default_port")]
  pub port:               u16,
  /// Public origin of the site.
  #[serde(default = "default_base_url")]
  pub base_url:           String,
  #[serde(default = "default_database_path")]
  pub database_path:      PathBuf,
  #[serde(default = "default_username")]
  pub auth_username:      String,
  /// PHC string produced by `tessera --hash-password`. Empty disables login.
  #[serde(default)]
  pub auth_password_hash: String,
  #[serde(default = "default_session_ttl")]
  pub session_ttl_hours:  u32,
  #[serde(default)]
  pub secure_cookies:     bool,

  pub openrouter_key:   Option<String>,
  pub openrouter_model: Option<String>,
  pub bunny_pull_zone_url: Option<String>,
  pub rag_remove_document_webhook_url: Option<String>,

  /// Extra hosts whose analytics events are dropped.
  #[serde(default)]
  pub dev_hosts: Vec<String>,
}

fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 8080 }
fn default_base_url() -> String { "http://localhost:8080".into() }
fn default_database_path() -> PathBuf { PathBuf::from("tessera.db") }
fn default_username() -> String { "admin".into() }
fn default_session_ttl() -> u32 { 24 * 7 }

impl ServerConfig {
  /// Read `path` (if it exists) and the process environment.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    Self::build(
      File::from(path).required(false),
      Environment::with_prefix("TESSERA"),
      |name| std::env::var(name).ok(),
    )
  }

  fn build<F>(
    file: F,
    env: Environment,
    bare: impl Fn(&str) -> Option<String>,
  ) -> Result<Self, ConfigError>
  where
    F: Source + Send + Sync + 'static,
  {
    let env = env
      .try_parsing(true)
      .list_separator(",")
      .with_list_parse_key("dev_hosts");
    let mut builder = Config::builder().add_source(file).add_source(env);
    for (key, var) in BARE_ENV {
      builder = builder.set_override_option(*key, bare(var).filter(|v| !v.trim().is_empty()))?;
    }
    builder.build()?.try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use config::FileFormat;

  use super::*;

  fn env(vars: &[(&str, &str)]) -> Environment {
    let map: HashMap<String, String> =
      vars.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
    Environment::with_prefix("TESSERA").source(Some(map))
  }

  #[test]
  fn defaults_apply_without_a_file() {
    let cfg = ServerConfig::build(File::from_str("", FileFormat::Toml), env(&[]), |_| None).unwrap();
    assert_eq!(cfg.address(), "127.0.0.1:8080");
    assert_eq!(cfg.session_ttl_hours, 168);
    assert!(cfg.openrouter_key.is_none());
    assert!(cfg.dev_hosts.is_empty());
  }

  #[test]
  fn environment_overrides_the_file() {
    let file = File::from_str(
      "port = 9000\nbase_url = \"https://acme.test\"\nopenrouter_key = \"from-file\"",
      FileFormat::Toml,
    );
    let cfg = ServerConfig::build(
      file,
      env(&[("TESSERA_PORT", "9100"), ("TESSERA_DEV_HOSTS", "preview.acme.test,qa.acme.test")]),
      |name| (name == "OPENROUTER_KEY").then(|| "sk-env".to_owned()),
    )
    .unwrap();
    assert_eq!(cfg.port, 9100);
    assert_eq!(cfg.base_url, "https://acme.test");
    assert_eq!(cfg.openrouter_key.as_deref(), Some("sk-env"));
    assert_eq!(cfg.dev_hosts, vec!["preview.acme.test", "qa.acme.test"]);
  }

  #[test]
  fn blank_bare_variables_are_ignored() {
    let file = File::from_str("bunny_pull_zone_url = \"https://cdn.acme.test\"", FileFormat::Toml);
    let cfg = ServerConfig::build(file, env(&[]), |_| Some("  ".to_owned())).unwrap();
    assert_eq!(cfg.bunny_pull_zone_url.as_deref(), Some("https://cdn.acme.test"));
  }
}
