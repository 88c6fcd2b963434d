//! Process configuration from the environment.
//!
//! `SGZ_BIND`, `SGZ_ROSTER_PATH`, `SGZ_CACHE_CAPACITY`, `SGZ_MAX_COMBINATIONS`. Unparseable
//! values are logged and replaced by the default.

use std::env;

use crate::data::roster::DEFAULT_ROSTER_PATH;
use crate::synergy::cache::DEFAULT_CACHE_CAPACITY;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5001";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: String,
    pub roster_path: String,
    pub cache_capacity: usize,
    pub max_combinations: Option<usize>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            roster_path: DEFAULT_ROSTER_PATH.to_string(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            max_combinations: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; used by `from_env` and by tests.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            bind_addr: lookup("SGZ_BIND").unwrap_or(defaults.bind_addr),
            roster_path: lookup("SGZ_ROSTER_PATH").unwrap_or(defaults.roster_path),
            cache_capacity: parse_or_default(
                "SGZ_CACHE_CAPACITY",
                lookup("SGZ_CACHE_CAPACITY"),
                defaults.cache_capacity,
            ),
            max_combinations: lookup("SGZ_MAX_COMBINATIONS").and_then(|raw| {
                match raw.trim().parse::<usize>() {
                    Ok(limit) => Some(limit),
                    Err(_) => {
                        tracing::warn!(value = %raw, "invalid SGZ_MAX_COMBINATIONS, search is unbounded");
                        None
                    }
                }
            }),
        }
    }
}

fn parse_or_default(name: &str, raw: Option<String>, default: usize) -> usize {
    match raw {
        None => default,
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(%name, %value, default, "invalid value, using default");
            default
        }),
    }
}
