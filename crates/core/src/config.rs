use std::env;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_f64(profile: &str, key: &str, default: f64) -> f64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub database: DatabaseConfig,
    pub queue: QueueConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `CUMULUS_PROFILE` env var. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("CUMULUS_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            database: DatabaseConfig::from_env_profiled(p),
            queue: QueueConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  database:  url={}, max_connections={}",
            self.database.url,
            self.database.max_connections
        );
        tracing::info!(
            "  queue:     retention_days={}, aging={}pts/{}min",
            self.queue.retention_days,
            self.queue.aging_max_boost,
            self.queue.aging_window_minutes
        );
    }
}

// ── Database ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection URL (e.g. `sqlite://data/cumulus.db`).
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            url: profiled_env_or(p, "DATABASE_URL", "sqlite://data/cumulus.db"),
            max_connections: profiled_env_u32(p, "DATABASE_MAX_CONNECTIONS", 5),
        }
    }
}

// ── Task queue ────────────────────────────────────────────────

/// Policy knobs for the processing task queue.
///
/// Aging: a waiting task's effective priority improves by up to
/// `aging_max_boost` points over `aging_window_minutes` of waiting, so old
/// low-priority tasks eventually outrank fresh high-priority ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Terminal (done/failed) rows older than this are garbage collected.
    pub retention_days: u32,
    /// Maximum priority boost a waiting task can accumulate.
    pub aging_max_boost: f64,
    /// Minutes of waiting over which the full boost accrues.
    pub aging_window_minutes: u32,
}

impl QueueConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            retention_days: profiled_env_u32(p, "QUEUE_RETENTION_DAYS", 14),
            aging_max_boost: profiled_env_f64(p, "QUEUE_AGING_MAX_BOOST", 100.0),
            aging_window_minutes: profiled_env_u32(p, "QUEUE_AGING_WINDOW_MINUTES", 1440),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            retention_days: 14,
            aging_max_boost: 100.0,
            aging_window_minutes: 1440,
        }
    }
}
