//! Engine configuration.
//!
//! Passed explicitly into the orchestrator; nothing in the engine reads the
//! environment on its own after construction.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::oracle::window::{WindowConfig, WindowStrategy, DEFAULT_WINDOW_CHARS};

pub const DEFAULT_MAX_CONCURRENCY: usize = 4;
pub const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Tuning knobs for one orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Upper bound on oracle calls in flight. Always at least 1.
    pub max_concurrency: usize,
    /// Per-call oracle timeout.
    pub oracle_timeout: Duration,
    pub window: WindowConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            oracle_timeout: DEFAULT_ORACLE_TIMEOUT,
            window: WindowConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `READINESS_*` environment variables.
    ///
    /// Unparseable or zero values are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let max_concurrency = parse_positive(
            &lookup,
            "READINESS_MAX_CONCURRENCY",
            defaults.max_concurrency,
        );
        let timeout_secs = parse_positive(
            &lookup,
            "READINESS_ORACLE_TIMEOUT_SECS",
            defaults.oracle_timeout.as_secs() as usize,
        );
        let max_chars = parse_positive(&lookup, "READINESS_WINDOW_CHARS", DEFAULT_WINDOW_CHARS);
        let strategy = parse_or(
            &lookup,
            "READINESS_WINDOW_STRATEGY",
            defaults.window.strategy,
        );

        Self {
            max_concurrency,
            oracle_timeout: Duration::from_secs(timeout_secs as u64),
            window: WindowConfig {
                max_chars,
                strategy,
            },
        }
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_oracle_timeout(mut self, timeout: Duration) -> Self {
        self.oracle_timeout = timeout;
        self
    }

    pub fn with_window(mut self, max_chars: usize, strategy: WindowStrategy) -> Self {
        self.window = WindowConfig {
            max_chars: max_chars.max(1),
            strategy,
        };
        self
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                warn!(key, value = %raw, default = %default, "invalid setting, using default");
                default
            }
        },
    }
}

fn parse_positive(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: usize) -> usize {
    match parse_or(lookup, key, default) {
        0 => {
            warn!(key, default, "setting must be positive, using default");
            default
        }
        v => v,
    }
}
