//! herald server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, and serves the campaign dispatch API over HTTP.

mod config;
mod outbound;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use axum::Router;
use clap::Parser;
use herald_api::AppState;
use herald_engine::{DispatchOptions, Orchestrator};
use herald_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use url::Url;

use crate::{
  config::ServerConfig,
  outbound::{HttpDirectory, HttpMailer},
};

#[derive(Parser)]
#[command(author, version, about = "Herald campaign dispatch server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = ::config::Config::builder()
    .add_source(::config::File::from(cli.config).required(false))
    .add_source(::config::Environment::with_prefix("HERALD").separator("__"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  // Open SQLite store.
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let store = Arc::new(store);

  let unsubscribe_base_url = Url::parse(&server_cfg.unsubscribe_base_url)
    .context("unsubscribe_base_url is not a valid absolute URL")?;

  // Outbound HTTP collaborators share one client.
  let http = reqwest::Client::builder()
    .timeout(Duration::from_secs(server_cfg.send_timeout_secs))
    .build()
    .context("failed to build HTTP client")?;
  let mailer = HttpMailer::new(
    http.clone(),
    &server_cfg.mailer.api_url,
    server_cfg.mailer.api_key.clone(),
  );
  let directory = HttpDirectory::new(http, &server_cfg.directory.api_url);

  let orchestrator = Orchestrator::new(
    store.clone(),
    Arc::new(directory),
    Arc::new(mailer),
    DispatchOptions {
      unsubscribe_base_url,
      send_timeout: Duration::from_secs(server_cfg.send_timeout_secs),
      directory_page_size: server_cfg.directory_page_size,
      max_recipients: server_cfg.max_recipients,
    },
  );

  let state = AppState { store, orchestrator: Arc::new(orchestrator) };
  let app = Router::new()
    .nest("/api", herald_api::api_router(state))
    .layer(TraceLayer::new_for_http());

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
