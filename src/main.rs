mod cache;
mod config;
mod db;
mod engine;
mod http;
mod import;
mod logging;
mod scripture;

use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "sword-proxy")]
#[command(about = "A caching REST proxy for a SWORD scripture engine")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/sword-proxy/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Address to listen on (overrides config)
  #[arg(short, long)]
  listen: Option<SocketAddr>,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Serve the JSON API (default)
  Serve,
  /// Populate the local mirror from the engine
  Import {
    /// Also import verse text
    #[arg(long)]
    verses: bool,
  },
  /// Delete expired entries from the cache store
  PurgeCache,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  // Override listen address if specified on command line
  let config = if let Some(listen) = args.listen {
    config::Config {
      server: config::ServerConfig { listen },
      ..config
    }
  } else {
    config
  };

  let _log_guard = logging::init(&config.logging)?;

  match args.command.unwrap_or(Command::Serve) {
    Command::Serve => {
      let scripture = scripture::ScriptureService::from_config(&config)?;

      let listener = tokio::net::TcpListener::bind(config.server.listen)
        .await
        .map_err(|e| eyre!("Failed to bind {}: {}", config.server.listen, e))?;
      info!(
        listen = %config.server.listen,
        engine = %config.engine.base_url(),
        "serving"
      );

      let router = http::build_router(http::AppState { scripture });
      axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| eyre!("Server error: {}", e))?;
    }
    Command::Import { verses } => {
      let scripture = scripture::ScriptureService::from_config(&config)?;
      let summary = import::import(scripture.engine(), scripture.directory(), verses).await?;
      info!(
        books = summary.books,
        chapters = summary.chapters,
        verses = summary.verses,
        "import finished"
      );
    }
    Command::PurgeCache => {
      let purged = cache::CacheLayer::from_config(&config.cache)?.purge_expired()?;
      info!(purged, "expired cache entries removed");
    }
  }

  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::warn!(error = %e, "failed to listen for shutdown signal");
  }
}
