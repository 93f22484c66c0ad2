//! Global application configuration manager.
//!
//! `AppConfig` is a lazily initialized, globally accessible singleton containing
//! runtime configuration values loaded from environment variables. It provides
//! thread-safe access and mutation for testing or overrides in runtime environments.
//!
//! Prefer the free functions at the bottom of this module (`config::port()`,
//! `config::admin_secret()`, ...) from async code: they clone the value out and
//! release the lock immediately.

use std::collections::BTreeMap;
use std::env;
use std::str::FromStr;
use std::sync::{OnceLock, RwLock, RwLockReadGuard};

/// Represents the complete application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    pub log_to_stdout: bool,
    pub database_path: String,
    pub host: String,
    pub port: u16,
    pub site_url: String,

    pub discord_api_base: String,
    pub discord_bot_token: String,
    pub discord_client_id: String,
    pub discord_client_secret: String,
    pub discord_guild_id: String,
    /// Discord category channel id -> dashboard category name.
    pub category_mappings: BTreeMap<String, String>,
    pub high_priority_categories: Vec<String>,

    pub admin_secret: String,
    pub webhook_secret: String,
    pub session_ttl_days: i64,

    pub scheduler_enabled: bool,
    pub sync_interval_seconds: u64,
    pub archive_interval_seconds: u64,
    pub archive_threshold: u64,
    pub archive_batch_size: u64,
}

/// Lazily-initialized, thread-safe singleton instance of `AppConfig`.
static CONFIG_INSTANCE: OnceLock<RwLock<AppConfig>> = OnceLock::new();

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn flag_or(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
        Err(_) => default,
    }
}

/// Parses `channelCategoryId=Name,otherId=Other` into a map. Malformed pairs are ignored.
pub fn parse_category_mappings(raw: &str) -> BTreeMap<String, String> {
    raw.split(',')
        .filter_map(|pair| {
            let (id, name) = pair.split_once('=')?;
            let (id, name) = (id.trim(), name.trim());
            if id.is_empty() || name.is_empty() {
                None
            } else {
                Some((id.to_string(), name.to_string()))
            }
        })
        .collect()
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl AppConfig {
    /// Loads the configuration from `.env` and environment variables.
    ///
    /// Every value has a default so that tooling and tests can start without a
    /// populated environment. Secrets default to empty, which the HTTP layer
    /// treats as "reject everything".
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            env: var_or("APP_ENV", "development"),
            project_name: var_or("PROJECT_NAME", "ticket-dashboard"),
            log_level: var_or("LOG_LEVEL", "api=info,services=info"),
            log_file: var_or("LOG_FILE", "api.log"),
            log_to_stdout: flag_or("LOG_TO_STDOUT", false),
            database_path: var_or("DATABASE_PATH", "data/tickets.db"),
            host: var_or("HOST", "127.0.0.1"),
            port: parse_or("PORT", 3000),
            site_url: var_or("SITE_URL", "http://localhost:3000"),

            discord_api_base: var_or("DISCORD_API_BASE", "https://discord.com/api/v10"),
            discord_bot_token: var_or("DISCORD_BOT_TOKEN", ""),
            discord_client_id: var_or("DISCORD_CLIENT_ID", ""),
            discord_client_secret: var_or("DISCORD_CLIENT_SECRET", ""),
            discord_guild_id: var_or("DISCORD_GUILD_ID", ""),
            category_mappings: parse_category_mappings(&var_or("DISCORD_CATEGORY_MAPPINGS", "")),
            high_priority_categories: parse_list(&var_or("HIGH_PRIORITY_CATEGORIES", "Claim,Bugs")),

            admin_secret: var_or("ADMIN_SECRET", ""),
            webhook_secret: var_or("WEBHOOK_SECRET", ""),
            session_ttl_days: parse_or("SESSION_TTL_DAYS", 7),

            scheduler_enabled: flag_or("SCHEDULER_ENABLED", true),
            sync_interval_seconds: parse_or("SYNC_INTERVAL_SECONDS", 120),
            archive_interval_seconds: parse_or("ARCHIVE_INTERVAL_SECONDS", 86_400),
            archive_threshold: parse_or("ARCHIVE_THRESHOLD", 480),
            archive_batch_size: parse_or("ARCHIVE_BATCH_SIZE", 100),
        }
    }

    fn lock() -> &'static RwLock<AppConfig> {
        CONFIG_INSTANCE.get_or_init(|| RwLock::new(AppConfig::from_env()))
    }

    /// Returns a shared reference to the global configuration.
    ///
    /// Do not hold the returned guard across an `.await`.
    pub fn global() -> RwLockReadGuard<'static, AppConfig> {
        Self::lock()
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Resets the configuration by reloading from environment variables.
    ///
    /// Useful in tests to clear overrides.
    pub fn reset() {
        if let Some(lock) = CONFIG_INSTANCE.get() {
            let mut guard = lock.write().unwrap_or_else(|p| p.into_inner());
            *guard = AppConfig::from_env();
        }
    }

    /// Generic internal setter for any field in the config.
    fn set_field<F>(setter: F)
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut guard = Self::lock().write().unwrap_or_else(|p| p.into_inner());
        setter(&mut guard);
    }

    // --- Per-field setters below ---

    pub fn set_env(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.env = value.into());
    }

    pub fn set_log_to_stdout(value: bool) {
        AppConfig::set_field(|cfg| cfg.log_to_stdout = value);
    }

    pub fn set_database_path(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.database_path = value.into());
    }

    pub fn set_site_url(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.site_url = value.into());
    }

    pub fn set_discord_guild_id(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.discord_guild_id = value.into());
    }

    pub fn set_category_mappings(value: BTreeMap<String, String>) {
        AppConfig::set_field(|cfg| cfg.category_mappings = value);
    }

    pub fn set_high_priority_categories(value: Vec<String>) {
        AppConfig::set_field(|cfg| cfg.high_priority_categories = value);
    }

    pub fn set_admin_secret(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.admin_secret = value.into());
    }

    pub fn set_webhook_secret(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.webhook_secret = value.into());
    }

    pub fn set_session_ttl_days(value: i64) {
        AppConfig::set_field(|cfg| cfg.session_ttl_days = value);
    }

    pub fn set_scheduler_enabled(value: bool) {
        AppConfig::set_field(|cfg| cfg.scheduler_enabled = value);
    }

    pub fn set_archive_threshold(value: u64) {
        AppConfig::set_field(|cfg| cfg.archive_threshold = value);
    }

    pub fn set_archive_batch_size(value: u64) {
        AppConfig::set_field(|cfg| cfg.archive_batch_size = value);
    }
}

// --- Free-function accessors ---

pub fn env() -> String {
    AppConfig::global().env.clone()
}

pub fn project_name() -> String {
    AppConfig::global().project_name.clone()
}

pub fn log_level() -> String {
    AppConfig::global().log_level.clone()
}

pub fn log_file() -> String {
    AppConfig::global().log_file.clone()
}

pub fn log_to_stdout() -> bool {
    AppConfig::global().log_to_stdout
}

pub fn database_path() -> String {
    AppConfig::global().database_path.clone()
}

pub fn host() -> String {
    AppConfig::global().host.clone()
}

pub fn port() -> u16 {
    AppConfig::global().port
}

pub fn site_url() -> String {
    AppConfig::global().site_url.trim_end_matches('/').to_string()
}

pub fn discord_api_base() -> String {
    AppConfig::global()
        .discord_api_base
        .trim_end_matches('/')
        .to_string()
}

pub fn discord_bot_token() -> String {
    AppConfig::global().discord_bot_token.clone()
}

pub fn discord_client_id() -> String {
    AppConfig::global().discord_client_id.clone()
}

pub fn discord_client_secret() -> String {
    AppConfig::global().discord_client_secret.clone()
}

pub fn discord_guild_id() -> String {
    AppConfig::global().discord_guild_id.clone()
}

pub fn category_mappings() -> BTreeMap<String, String> {
    AppConfig::global().category_mappings.clone()
}

pub fn high_priority_categories() -> Vec<String> {
    AppConfig::global().high_priority_categories.clone()
}

pub fn admin_secret() -> String {
    AppConfig::global().admin_secret.clone()
}

pub fn webhook_secret() -> String {
    AppConfig::global().webhook_secret.clone()
}

pub fn session_ttl_days() -> i64 {
    AppConfig::global().session_ttl_days
}

pub fn scheduler_enabled() -> bool {
    AppConfig::global().scheduler_enabled
}

pub fn sync_interval_seconds() -> u64 {
    AppConfig::global().sync_interval_seconds
}

pub fn archive_interval_seconds() -> u64 {
    AppConfig::global().archive_interval_seconds
}

pub fn archive_threshold() -> u64 {
    AppConfig::global().archive_threshold
}

pub fn archive_batch_size() -> u64 {
    AppConfig::global().archive_batch_size
}
