//! Configuration management
//!
//! This module provides YAML-based configuration management with support for:
//! - Environment variable overrides
//! - Multiple configuration file locations
//! - Default values for all settings
//! - Entitlement and key policies for the bot core

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::MAX_DURATION_DAYS;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub bot: BotConfig,
    /// Chat platform REST client (deliveries are reported as failed when absent)
    #[serde(default)]
    pub platform: Option<PlatformConfig>,
    #[serde(default)]
    pub ingress: IngressConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// TLS/HTTPS configuration (if not set, server runs HTTP)
    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

/// TLS/HTTPS configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to TLS certificate file (PEM format)
    pub cert_file: PathBuf,
    /// Path to TLS private key file (PEM format)
    pub key_file: PathBuf,
    /// Minimum TLS version (1.2 or 1.3)
    #[serde(default = "default_min_tls_version")]
    pub min_version: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5060
}

fn default_min_tls_version() -> String {
    "1.3".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: None,
            tls: None,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_database_url() -> String {
    "sqlite://./data/keygate.db?mode=rwc".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_connect_timeout() -> u64 {
    30
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    /// Log output target (console or file)
    #[serde(default = "default_log_target")]
    pub target: LogTarget,
    /// Directory for log files (used when target is "file" or "both")
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Log file name prefix
    #[serde(default = "default_log_prefix")]
    pub log_prefix: String,
    #[serde(default = "default_log_rotation")]
    pub daily_rotation: bool,
}

/// Log output target
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    #[default]
    Console,
    File,
    Both,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_log_target() -> LogTarget {
    LogTarget::Console
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("/var/log/keygate")
}

fn default_log_prefix() -> String {
    "keygate".to_string()
}

fn default_log_rotation() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            target: default_log_target(),
            log_dir: default_log_dir(),
            log_prefix: default_log_prefix(),
            daily_rotation: default_log_rotation(),
        }
    }
}

/// How long a panel key redemption grants access for.
///
/// Manager-issued keys carry their own `duration_days`; the panel flow
/// grants a flat window unless the deployment selects `key_duration`.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RedeemGrantPolicy {
    /// `now + redeem_grant_hours`, regardless of the key's duration
    #[default]
    Flat,
    /// `now + key.duration_days`
    KeyDuration,
}

/// Bot core configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BotConfig {
    /// Immutable primary owner identity
    #[serde(default)]
    pub primary_owner_id: String,
    /// Allow users to reset their own HWID from the panel
    #[serde(default)]
    pub enable_self_hwid_reset: bool,
    /// Script used when no panel template has been configured
    #[serde(default = "default_script_template")]
    pub default_script_template: String,
    #[serde(default)]
    pub redeem_grant: RedeemGrantPolicy,
    #[serde(default = "default_redeem_grant_hours")]
    pub redeem_grant_hours: i64,
    /// Default duration for `/whitelist`, `/createkey` and `/genkeys`
    #[serde(default = "default_duration_days")]
    pub default_duration_days: i64,
    /// Unused keys older than this report as expired (never, when unset)
    #[serde(default)]
    pub unused_key_ttl_days: Option<i64>,
    /// Insert DEMO-KEY-1..5 at startup
    #[serde(default = "default_seed_demo_keys")]
    pub seed_demo_keys: bool,
}

fn default_script_template() -> String {
    "script_key = \"{{KEY}}\"\nloadstring(game:HttpGet(\"https://keygate.invalid/loader.lua\"))()\n"
        .to_string()
}

fn default_redeem_grant_hours() -> i64 {
    24
}

fn default_duration_days() -> i64 {
    30
}

fn default_seed_demo_keys() -> bool {
    true
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            primary_owner_id: String::new(),
            enable_self_hwid_reset: false,
            default_script_template: default_script_template(),
            redeem_grant: RedeemGrantPolicy::default(),
            redeem_grant_hours: default_redeem_grant_hours(),
            default_duration_days: default_duration_days(),
            unused_key_ttl_days: None,
            seed_demo_keys: default_seed_demo_keys(),
        }
    }
}

/// Chat platform REST API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlatformConfig {
    #[serde(default = "default_platform_url")]
    pub api_base_url: String,
    pub bot_token: String,
    /// Guild the panel and roles live in
    pub guild_id: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_platform_url() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_timeout() -> u64 {
    15
}

/// Interaction ingress configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct IngressConfig {
    /// Shared secret for the HMAC-SHA256 signature on relayed interactions
    #[serde(default)]
    pub signing_secret: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            bot: BotConfig::default(),
            platform: None,
            ingress: IngressConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values
    /// 2. Configuration file (YAML)
    /// 3. Environment variables
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let config_path = std::env::var("KEYGATE_CONFIG")
            .map(PathBuf::from)
            .ok()
            .or_else(Self::find_config_file);

        let mut config = match config_path {
            Some(ref path) if path.exists() => {
                eprintln!("[CONFIG] Loading configuration from: {:?}", path);
                Self::from_file(path)?
            }
            Some(ref path) => {
                eprintln!("[CONFIG] Config file not found: {:?}", path);
                AppConfig::default()
            }
            None => {
                eprintln!("[CONFIG] No config file found, using defaults");
                AppConfig::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parse a configuration file without applying overrides
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        serde_norway::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Find the configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let paths = [
            PathBuf::from("config.yaml"),
            PathBuf::from("config/config.yaml"),
            PathBuf::from("/etc/keygate/config.yaml"),
            dirs::config_dir()
                .map(|p| p.join("keygate/config.yaml"))
                .unwrap_or_default(),
        ];

        paths.into_iter().find(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("KEYGATE_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("KEYGATE_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }

        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("KEYGATE_LOG_FORMAT") {
            self.logging.format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "compact" => LogFormat::Compact,
                _ => LogFormat::Pretty,
            };
        }
        if let Ok(target) = std::env::var("KEYGATE_LOG_TARGET") {
            self.logging.target = match target.to_lowercase().as_str() {
                "file" => LogTarget::File,
                "both" => LogTarget::Both,
                _ => LogTarget::Console,
            };
        }
        if let Ok(dir) = std::env::var("KEYGATE_LOG_DIR") {
            self.logging.log_dir = PathBuf::from(dir);
        }

        if let Ok(owner) = std::env::var("KEYGATE_OWNER_ID") {
            self.bot.primary_owner_id = owner;
        }
        if let Ok(flag) = std::env::var("ENABLE_SELF_HWID_RESET") {
            self.bot.enable_self_hwid_reset = parse_bool(&flag);
        }
        if let Ok(script) = std::env::var("SCRIPT_CONTENT") {
            self.bot.default_script_template = script;
        }

        if let Ok(token) = std::env::var("DISCORD_BOT_TOKEN") {
            let guild_id = std::env::var("KEYGATE_GUILD_ID").unwrap_or_default();
            match self.platform {
                Some(ref mut platform) => {
                    platform.bot_token = token;
                    if !guild_id.is_empty() {
                        platform.guild_id = guild_id;
                    }
                }
                None => {
                    self.platform = Some(PlatformConfig {
                        api_base_url: default_platform_url(),
                        bot_token: token,
                        guild_id,
                        timeout_secs: default_timeout(),
                    });
                }
            }
        }

        if let Ok(secret) = std::env::var("KEYGATE_SIGNING_SECRET") {
            self.ingress.signing_secret = secret;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.bot.primary_owner_id.trim().is_empty() {
            anyhow::bail!("bot.primary_owner_id must be set (or KEYGATE_OWNER_ID)");
        }
        if self.ingress.signing_secret.len() < 16 {
            anyhow::bail!("ingress.signing_secret must be at least 16 characters");
        }
        if !(1..=MAX_DURATION_DAYS * 24).contains(&self.bot.redeem_grant_hours) {
            anyhow::bail!(
                "bot.redeem_grant_hours must be between 1 and {}",
                MAX_DURATION_DAYS * 24
            );
        }
        if !(1..=MAX_DURATION_DAYS).contains(&self.bot.default_duration_days) {
            anyhow::bail!(
                "bot.default_duration_days must be between 1 and {}",
                MAX_DURATION_DAYS
            );
        }
        if let Some(ttl) = self.bot.unused_key_ttl_days {
            if !(1..=MAX_DURATION_DAYS).contains(&ttl) {
                anyhow::bail!(
                    "bot.unused_key_ttl_days must be between 1 and {} when set",
                    MAX_DURATION_DAYS
                );
            }
        }
        if let Some(ref platform) = self.platform {
            if platform.guild_id.is_empty() {
                anyhow::bail!("platform.guild_id must be set when a platform is configured");
            }
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
