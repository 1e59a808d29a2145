//! Tessera server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) and `TESSERA_*`
//! environment variables, opens the SQLite database and serves the admin,
//! intel, chat and public site APIs over HTTP.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for `auth_password_hash`:
//!
//! ```text
//! cargo run -p tessera-server -- --hash-password
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use clap::Parser;
use rand_core::OsRng;
use tessera_api::{ApiSettings, ApiState, OpenRouter, TagCache, WebhookClient};
use tessera_server::{
  ServerConfig,
  auth::{AuthConfig, AuthState},
  config::expand_tilde,
};
use tessera_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Tessera content server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, env = "TESSERA_CONFIG", default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.hash_password {
    let password = read_password()?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string();
    println!("{hash}");
    return Ok(());
  }

  let cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;
  if cfg.auth_password_hash.is_empty() {
    tracing::warn!("auth_password_hash is not set; operator login is disabled");
  }

  let database_path = expand_tilde(&cfg.database_path);
  let store = Arc::new(
    SqliteStore::open(&database_path)
      .await
      .with_context(|| format!("failed to open database at {database_path:?}"))?,
  );

  let gateway = OpenRouter::new(cfg.openrouter_key.clone(), cfg.openrouter_model.clone())
    .context("failed to build the OpenRouter client")?
    .with_referer(cfg.base_url.clone());
  if !gateway.is_configured() {
    tracing::warn!("OPENROUTER_KEY is not set; chat replies will answer 503");
  }
  let webhooks = WebhookClient::new(cfg.rag_remove_document_webhook_url.clone())
    .context("failed to build the webhook client")?;

  let api = ApiState {
    store: store.clone(),
    cache: Arc::new(TagCache::new()),
    chat: Arc::new(gateway),
    webhooks,
    settings: Arc::new(ApiSettings {
      base_url:  cfg.base_url.clone(),
      pull_zone: cfg.bunny_pull_zone_url.clone(),
      dev_hosts: cfg.dev_hosts.clone(),
    }),
  };
  let auth = AuthState {
    store,
    auth: Arc::new(AuthConfig {
      username:       cfg.auth_username.clone(),
      password_hash:  cfg.auth_password_hash.clone(),
      session_ttl:    chrono::Duration::hours(i64::from(cfg.session_ttl_hours)),
      secure_cookies: cfg.secure_cookies,
    }),
  };

  let app = tessera_server::app(api, auth);
  let address = cfg.address();

  tracing::info!(database = ?database_path, "listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_owned())
}
