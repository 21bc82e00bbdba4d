use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub google: GoogleConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

/// Token secrets and lifetimes.
///
/// Access and refresh tokens use distinct secrets so that a leaked
/// long-lived refresh token cannot be replayed as an access token (and
/// vice versa). The admin console issues its own short-lived token with
/// a third secret.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_access_secret")]
    pub access_secret: String,
    #[serde(default = "default_access_ttl_days")]
    pub access_ttl_days: i64,
    #[serde(default = "default_refresh_secret")]
    pub refresh_secret: String,
    #[serde(default = "default_refresh_ttl_days")]
    pub refresh_ttl_days: i64,
    #[serde(default = "default_admin_secret")]
    pub admin_secret: String,
    #[serde(default = "default_admin_ttl_hours")]
    pub admin_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_secret: default_access_secret(),
            access_ttl_days: default_access_ttl_days(),
            refresh_secret: default_refresh_secret(),
            refresh_ttl_days: default_refresh_ttl_days(),
            admin_secret: default_admin_secret(),
            admin_ttl_hours: default_admin_ttl_hours(),
        }
    }
}

fn default_access_secret() -> String {
    "forge-church-secret".to_string()
}

fn default_access_ttl_days() -> i64 {
    7
}

fn default_refresh_secret() -> String {
    "forge-refresh-secret".to_string()
}

fn default_refresh_ttl_days() -> i64 {
    30
}

fn default_admin_secret() -> String {
    "fallback-secret-key".to_string()
}

fn default_admin_ttl_hours() -> i64 {
    24
}

impl AuthConfig {
    /// Names of secrets still running on their compiled-in defaults.
    /// Logged as a warning at startup so operators rotate them.
    pub fn default_secrets_in_use(&self) -> Vec<&'static str> {
        let mut defaults = Vec::new();
        if self.access_secret == default_access_secret() {
            defaults.push("auth.access_secret");
        }
        if self.refresh_secret == default_refresh_secret() {
            defaults.push("auth.refresh_secret");
        }
        if self.admin_secret == default_admin_secret() {
            defaults.push("auth.admin_secret");
        }
        defaults
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoogleConfig {
    /// OAuth client id used as the expected audience when verifying
    /// Google-issued ID tokens. Google sign-in is disabled when unset.
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| "Failed to parse configuration file")?;
            Ok(config)
        } else {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            google: GoogleConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
