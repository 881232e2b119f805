use std::env;
use std::time::Duration;

use crate::import::SessionOptions;

pub const DEFAULT_SCHEMA: &str = "import";
pub const DEFAULT_NULL_SENTINEL: &str = "\\N";
pub const DEFAULT_FLUSH_BYTES: usize = 64 * 1024;

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

fn env_duration_millis(key: &str, default_millis: u64) -> Duration {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or_else(|| Duration::from_millis(default_millis))
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Runtime configuration for imports, read from the environment.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub database_url: Option<String>,
    pub schema: String,
    pub null_sentinel: String,
    pub flush_bytes: usize,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub progress_every: usize,
}

impl ImportConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            schema: env_string("IMPORT_SCHEMA", DEFAULT_SCHEMA),
            null_sentinel: env_string("IMPORT_NULL_SENTINEL", DEFAULT_NULL_SENTINEL),
            flush_bytes: env_usize("IMPORT_FLUSH_BYTES", DEFAULT_FLUSH_BYTES).max(1),
            max_connections: env_u32("IMPORT_MAX_CONNECTIONS", 2),
            acquire_timeout: env_duration_millis("IMPORT_ACQUIRE_TIMEOUT_MS", 30_000),
            progress_every: env_usize("IMPORT_PROGRESS_EVERY", 100_000),
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            flush_threshold: self.flush_bytes,
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helpers_fall_back_on_missing_or_invalid_values() {
        assert_eq!(env_usize("PGCOPY_TEST_UNSET_USIZE", 7), 7);
        assert_eq!(env_u32("PGCOPY_TEST_UNSET_U32", 3), 3);
        assert_eq!(
            env_duration_millis("PGCOPY_TEST_UNSET_MS", 250),
            Duration::from_millis(250)
        );
        assert_eq!(env_string("PGCOPY_TEST_UNSET_STRING", "x"), "x");
    }

    #[test]
    fn session_options_follow_flush_bytes() {
        let config = ImportConfig {
            database_url: None,
            schema: DEFAULT_SCHEMA.to_string(),
            null_sentinel: DEFAULT_NULL_SENTINEL.to_string(),
            flush_bytes: 4096,
            max_connections: 1,
            acquire_timeout: Duration::from_secs(1),
            progress_every: 10,
        };
        assert_eq!(config.session_options().flush_threshold, 4096);
    }
}
