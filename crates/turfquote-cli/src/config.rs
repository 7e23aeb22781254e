//! Configuration file management for turfquote.
//!
//! A TOML file at `~/.config/turfquote/config.toml` plus a resolution
//! chain: CLI flag > env var > config file > default.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use turfquote_db::config::DbConfig;

pub const WEBHOOK_SECRET_ENV: &str = "TURFQUOTE_WEBHOOK_SECRET";
pub const CATALOG_ENV: &str = "TURFQUOTE_CATALOG";

pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub pricing: PricingSection,
    #[serde(default)]
    pub identity: IdentitySection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: DbConfig::DEFAULT_URL.to_owned(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

fn default_bind() -> String {
    DEFAULT_BIND.to_owned()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PricingSection {
    /// Catalog TOML to use instead of the built-in one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct IdentitySection {
    /// Hex-encoded webhook signing secret (64 hex chars = 32 bytes).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_secret: Option<String>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// `$XDG_CONFIG_HOME/turfquote`, or `~/.config/turfquote`.
///
/// macOS gets the same layout; `dirs::config_dir()` is not used.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("turfquote");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("turfquote")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Errors if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))
}

/// Write the config file, creating parent dirs. Mode 0600 on Unix since
/// it holds the webhook secret.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

/// 32 random bytes, hex-encoded.
pub fn generate_webhook_secret() -> String {
    use rand::Rng;
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

#[derive(Debug)]
pub struct TurfquoteConfig {
    pub db_config: DbConfig,
    /// `None` means the built-in catalog.
    pub catalog_path: Option<PathBuf>,
    /// Decoded webhook secret. `None` disables the webhook route.
    pub webhook_secret: Option<Vec<u8>>,
    pub bind: String,
    pub port: u16,
}

impl TurfquoteConfig {
    /// Resolve settings from flags, environment, and the config file.
    ///
    /// - DB URL: `cli_db_url` > `TURFQUOTE_DATABASE_URL` > file > `DbConfig::DEFAULT_URL`
    /// - Catalog: `cli_catalog` > `TURFQUOTE_CATALOG` > file > built-in
    /// - Webhook secret: `TURFQUOTE_WEBHOOK_SECRET` > file > none
    ///
    /// A missing config file is fine; a malformed one is an error.
    pub fn resolve(cli_db_url: Option<&str>, cli_catalog: Option<&str>) -> Result<Self> {
        let file_config = if config_path().exists() {
            Some(load_config()?)
        } else {
            None
        };

        let db_url = if let Some(url) = cli_db_url {
            url.to_owned()
        } else if let Ok(url) = std::env::var(DbConfig::ENV_VAR) {
            url
        } else if let Some(ref cfg) = file_config {
            cfg.database.url.clone()
        } else {
            DbConfig::DEFAULT_URL.to_owned()
        };

        let catalog_path = if let Some(path) = cli_catalog {
            Some(PathBuf::from(path))
        } else if let Ok(path) = std::env::var(CATALOG_ENV) {
            Some(PathBuf::from(path))
        } else {
            file_config
                .as_ref()
                .and_then(|cfg| cfg.pricing.catalog_path.clone())
        };

        let webhook_secret = if let Ok(secret_hex) = std::env::var(WEBHOOK_SECRET_ENV) {
            Some(hex::decode(secret_hex.trim()).context("TURFQUOTE_WEBHOOK_SECRET is not valid hex")?)
        } else if let Some(secret_hex) = file_config
            .as_ref()
            .and_then(|cfg| cfg.identity.webhook_secret.as_deref())
        {
            Some(hex::decode(secret_hex).context("invalid hex in config file webhook_secret")?)
        } else {
            None
        };

        let (bind, port) = match file_config {
            Some(cfg) => (cfg.server.bind, cfg.server.port),
            None => (default_bind(), default_port()),
        };

        Ok(Self {
            db_config: DbConfig::new(db_url),
            catalog_path,
            webhook_secret: webhook_secret.filter(|s| !s.is_empty()),
            bind,
            port,
        })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
