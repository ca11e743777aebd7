//! Process configuration, read once from the environment at startup.

use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use crate::ledger::{CommunitySettings, RetryPolicy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub key: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid configuration for {}: {}", self.key, self.message)
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuidanceConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// `None` runs against the in-memory store.
    pub database_url: Option<String>,
    pub run_migrations: bool,
    pub retry: RetryPolicy,
    pub community: CommunitySettings,
    /// Requests per minute per client IP; unset disables rate limiting.
    pub rate_limit_per_minute: Option<u32>,
    pub guidance: Option<GuidanceConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            database_url: None,
            run_migrations: true,
            retry: RetryPolicy::default(),
            community: CommunitySettings::default(),
            rate_limit_per_minute: None,
            guidance: None,
        }
    }
}

impl Config {
    /// Reads configuration from the process environment. Call
    /// `dotenvy::dotenv()` first if a `.env` file should be honoured.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Config::default();

        let bind_addr = match get("BIND_ADDR") {
            Some(raw) => raw.parse().map_err(|e| ConfigError {
                key: "BIND_ADDR",
                message: format!("{} ({})", e, raw),
            })?,
            None => defaults.bind_addr,
        };

        let run_migrations = match get("RUN_MIGRATIONS") {
            Some(raw) => parse_bool("RUN_MIGRATIONS", &raw)?,
            None => defaults.run_migrations,
        };

        let mut retry = defaults.retry;
        if let Some(ms) = parse_opt::<u64>(&get, "LEDGER_RETRY_INITIAL_MS")? {
            retry.initial_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_opt::<u64>(&get, "LEDGER_RETRY_MAX_ELAPSED_MS")? {
            retry.max_elapsed = Duration::from_millis(ms);
        }
        if retry.initial_interval > retry.max_interval {
            retry.max_interval = retry.initial_interval;
        }

        let mut community = defaults.community;
        if let Some(days) = parse_opt::<u32>(&get, "COMMUNITY_WINDOW_DAYS")? {
            if days == 0 {
                return Err(ConfigError { key: "COMMUNITY_WINDOW_DAYS", message: "must be positive".to_string() });
            }
            community.window_days = days;
        }
        if let Some(target) = parse_opt::<u32>(&get, "COMMUNITY_TARGET")? {
            if target == 0 {
                return Err(ConfigError { key: "COMMUNITY_TARGET", message: "must be positive".to_string() });
            }
            community.target = target;
        }
        if let Some(n) = parse_opt::<usize>(&get, "COMMUNITY_TOP_CONTRIBUTORS")? {
            community.top_contributors = n;
        }
        if let Some(n) = parse_opt::<usize>(&get, "COMMUNITY_RECENT_ACTIVITIES")? {
            community.recent_activities = n;
        }

        let rate_limit_per_minute = parse_opt::<u32>(&get, "RATE_LIMIT_PER_MINUTE")?.filter(|n| *n > 0);

        let guidance = match (get("AZURE_OPENAI_ENDPOINT"), get("AZURE_OPENAI_API_KEY")) {
            (Some(endpoint), Some(api_key)) => Some(GuidanceConfig {
                endpoint,
                api_key,
                model: get("GUIDANCE_MODEL").unwrap_or_else(|| "gpt-4o".to_string()),
            }),
            _ => None,
        };

        Ok(Self {
            bind_addr,
            database_url: get("DATABASE_URL"),
            run_migrations,
            retry,
            community,
            rate_limit_per_minute,
            guidance,
        })
    }
}

fn parse_opt<T>(get: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match get(key) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError { key, message: format!("{} ({})", e, raw) }),
        None => Ok(None),
    }
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError { key, message: format!("expected a boolean, got {}", raw) }),
    }
}
