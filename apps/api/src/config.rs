use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    /// Analytics cache is disabled when unset.
    pub redis_url: Option<String>,
    /// Hire events are not delivered when unset.
    pub notify_webhook_url: Option<String>,
    pub payout_currency: String,
    pub analytics_cache_ttl_secs: u64,
    pub db_metrics_interval_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            db_max_connections: parse_env("DB_MAX_CONNECTIONS", 10)?,
            redis_url: optional_env("REDIS_URL"),
            notify_webhook_url: optional_env("NOTIFY_WEBHOOK_URL"),
            payout_currency: std::env::var("PAYOUT_CURRENCY")
                .unwrap_or_else(|_| "USD".to_string())
                .to_uppercase(),
            analytics_cache_ttl_secs: parse_env("ANALYTICS_CACHE_TTL_SECS", 300)?,
            db_metrics_interval_secs: parse_env("DB_METRICS_INTERVAL_SECS", 60)?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}
