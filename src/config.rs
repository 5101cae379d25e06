use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub engine: EngineConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub database: DatabaseConfig,
  #[serde(default)]
  pub server: ServerConfig,
  #[serde(default)]
  pub logging: LoggingConfig,
}

/// Where the upstream SWORD engine lives.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
  #[serde(default = "default_engine_host")]
  pub host: String,
  #[serde(default = "default_engine_port")]
  pub port: u16,
  /// Per-request timeout; an engine that doesn't answer in time counts as unavailable
  #[serde(default = "default_engine_timeout")]
  pub timeout_secs: u64,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      host: default_engine_host(),
      port: default_engine_port(),
      timeout_secs: default_engine_timeout(),
    }
  }
}

impl EngineConfig {
  pub fn base_url(&self) -> String {
    format!("http://{}:{}", self.host, self.port)
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

fn default_engine_host() -> String {
  "localhost".to_string()
}

fn default_engine_port() -> u16 {
  8080
}

fn default_engine_timeout() -> u64 {
  5
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
  /// SQLite file shared by every process pointed at the same path
  #[default]
  Sqlite,
  /// In-process map, lost on restart
  Memory,
  /// Caching disabled - every request goes to the engine
  None,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  #[serde(default)]
  pub backend: CacheBackend,
  /// SQLite file path (default: $XDG_DATA_HOME/sword-proxy/cache.db)
  pub path: Option<PathBuf>,
  #[serde(default = "default_cache_ttl")]
  pub ttl_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      backend: CacheBackend::default(),
      path: None,
      ttl_secs: default_cache_ttl(),
    }
  }
}

impl CacheConfig {
  /// Entry lifetime, clamped to `MAX_CACHE_TTL_SECS`.
  pub fn ttl(&self) -> chrono::Duration {
    chrono::Duration::seconds(self.ttl_secs.min(MAX_CACHE_TTL_SECS) as i64)
  }

  fn validate(&self) -> Result<()> {
    if self.ttl_secs == 0 || self.ttl_secs > MAX_CACHE_TTL_SECS {
      return Err(eyre!(
        "cache.ttl_secs must be between 1 and {}, got {}",
        MAX_CACHE_TTL_SECS,
        self.ttl_secs
      ));
    }
    Ok(())
  }

  pub fn resolved_path(&self) -> Result<PathBuf> {
    match &self.path {
      Some(p) => Ok(p.clone()),
      None => Ok(data_dir()?.join("cache.db")),
    }
  }
}

/// Ten years.
pub const MAX_CACHE_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

fn default_cache_ttl() -> u64 {
  3600
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfig {
  /// Local mirror path (default: $XDG_DATA_HOME/sword-proxy/mirror.db)
  pub path: Option<PathBuf>,
}

impl DatabaseConfig {
  pub fn resolved_path(&self) -> Result<PathBuf> {
    match &self.path {
      Some(p) => Ok(p.clone()),
      None => Ok(data_dir()?.join("mirror.db")),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_listen")]
  pub listen: SocketAddr,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      listen: default_listen(),
    }
  }
}

fn default_listen() -> SocketAddr {
  SocketAddr::from(([127, 0, 0, 1], 3000))
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
  /// Default filter directive; RUST_LOG takes precedence when set
  #[serde(default = "default_log_level")]
  pub level: String,
  /// Also write logs to this file
  pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      file: None,
    }
  }
}

fn default_log_level() -> String {
  "info".to_string()
}

fn data_dir() -> Result<PathBuf> {
  let data_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?;

  Ok(data_dir.join("sword-proxy"))
}

impl Config {
  /// Load configuration from file, then apply environment overrides.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./sword-proxy.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/sword-proxy/config.yaml
  ///
  /// If no file is found the defaults are used.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };

    config.with_env_overrides(|name| std::env::var(name).ok())
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("sword-proxy.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("sword-proxy").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    // An empty document deserializes to null, not to an empty mapping
    if contents.trim().is_empty() {
      return Ok(Config::default());
    }
    let config: Config = serde_yaml::from_str(contents).map_err(|e| eyre!("{}", e))?;
    config.cache.validate()?;
    Ok(config)
  }

  /// Apply SWORD_ENGINE_HOST / SWORD_ENGINE_PORT and the SWORD_PROXY_* overrides.
  ///
  /// `lookup` is `std::env::var` in production; tests pass a closure over a map.
  pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
  where
    F: Fn(&str) -> Option<String>,
  {
    if let Some(host) = lookup("SWORD_ENGINE_HOST") {
      self.engine.host = host;
    }
    if let Some(port) = lookup("SWORD_ENGINE_PORT") {
      self.engine.port = port
        .parse()
        .map_err(|e| eyre!("Invalid SWORD_ENGINE_PORT '{}': {}", port, e))?;
    }
    if let Some(path) = lookup("SWORD_PROXY_CACHE_PATH") {
      self.cache.path = Some(PathBuf::from(path));
    }
    if let Some(path) = lookup("SWORD_PROXY_DATABASE_PATH") {
      self.database.path = Some(PathBuf::from(path));
    }
    if let Some(listen) = lookup("SWORD_PROXY_LISTEN") {
      self.server.listen = listen
        .parse()
        .map_err(|e| eyre!("Invalid SWORD_PROXY_LISTEN '{}': {}", listen, e))?;
    }
    Ok(self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  #[test]
  fn test_defaults() {
    let config = Config::from_yaml("").unwrap();
    assert_eq!(config.engine.base_url(), "http://localhost:8080");
    assert_eq!(config.cache.ttl_secs, 3600);
    assert_eq!(config.cache.backend, CacheBackend::Sqlite);
    assert_eq!(config.server.listen.port(), 3000);
  }

  #[test]
  fn test_partial_yaml() {
    let config = Config::from_yaml(
      "engine:\n  host: sword\n  port: 8081\ncache:\n  backend: memory\n  ttl_secs: 60\n",
    )
    .unwrap();
    assert_eq!(config.engine.base_url(), "http://sword:8081");
    assert_eq!(config.engine.timeout_secs, 5);
    assert_eq!(config.cache.backend, CacheBackend::Memory);
    assert_eq!(config.cache.ttl(), chrono::Duration::seconds(60));
  }

  #[test]
  fn test_env_overrides() {
    let env: HashMap<&str, &str> = [
      ("SWORD_ENGINE_HOST", "engine.internal"),
      ("SWORD_ENGINE_PORT", "9000"),
      ("SWORD_PROXY_LISTEN", "0.0.0.0:8000"),
    ]
    .into_iter()
    .collect();

    let config = Config::default()
      .with_env_overrides(|name| env.get(name).map(|v| v.to_string()))
      .unwrap();

    assert_eq!(config.engine.base_url(), "http://engine.internal:9000");
    assert_eq!(config.server.listen.port(), 8000);
  }

  #[test]
  fn test_invalid_port_override() {
    let result = Config::default().with_env_overrides(|name| {
      (name == "SWORD_ENGINE_PORT").then(|| "not-a-port".to_string())
    });
    assert!(result.is_err());
  }

  #[test]
  fn test_out_of_range_ttl_is_rejected() {
    let err = Config::from_yaml("cache:\n  ttl_secs: 10000000000000\n").unwrap_err();
    assert!(err.to_string().contains("cache.ttl_secs"));

    assert!(Config::from_yaml("cache:\n  ttl_secs: 0\n").is_err());

    let max = format!("cache:\n  ttl_secs: {}\n", MAX_CACHE_TTL_SECS);
    let config = Config::from_yaml(&max).unwrap();
    assert_eq!(config.cache.ttl().num_seconds() as u64, MAX_CACHE_TTL_SECS);
  }

  #[test]
  fn test_missing_explicit_file() {
    let result = Config::load(Some(Path::new("/nonexistent/sword-proxy.yaml")));
    assert!(result.is_err());
  }
}
