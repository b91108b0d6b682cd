use crate::filters::{clamp_limits, DEFAULT_LIMIT, MAX_LIMIT};

// Runtime configuration for the dashboard, loaded from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub admin_addr: String,
    pub migrate_on_startup: bool,
    pub default_limit: i64,
    pub max_limit: i64,
    pub statement_timeout_ms: Option<u64>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL is missing"))?;

        let admin_addr = env_or_fallback("JOBFILTER_ADMIN_ADDR", "ADMIN_ADDR")
            .unwrap_or_else(|| "127.0.0.1:8080".to_string());

        let migrate_on_startup = env_bool("JOBFILTER_MIGRATE_ON_STARTUP").unwrap_or(false);

        let (default_limit, max_limit) = clamp_limits(
            env_parse::<i64>("JOBFILTER_DEFAULT_LIMIT")?.unwrap_or(DEFAULT_LIMIT),
            env_parse::<i64>("JOBFILTER_MAX_LIMIT")?.unwrap_or(MAX_LIMIT),
        );

        let statement_timeout_ms =
            env_parse::<u64>("JOBFILTER_STATEMENT_TIMEOUT_MS")?.filter(|ms| *ms > 0);

        Ok(Self {
            database_url,
            admin_addr,
            migrate_on_startup,
            default_limit,
            max_limit,
            statement_timeout_ms,
        })
    }
}

fn env_or_fallback(primary: &str, fallback: &str) -> Option<String> {
    std::env::var(primary)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .or_else(|| std::env::var(fallback).ok().filter(|s| !s.trim().is_empty()))
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

/// Unset or blank is `None`; a value that does not parse is an error.
fn env_parse<T: std::str::FromStr>(key: &str) -> anyhow::Result<Option<T>> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow::anyhow!("{key} must be a number, got {v:?}")),
        _ => Ok(None),
    }
}
