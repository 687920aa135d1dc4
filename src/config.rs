//! Process configuration read from the environment

use crate::state_machine::DEFAULT_MAX_STEPS;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_TURN_TIMEOUT: Duration = Duration::from_secs(30);
/// Longest accepted response ceiling, one day
pub const MAX_TURN_TIMEOUT: Duration = Duration::from_secs(86_400);

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Limits applied to every assistant response
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnConfig {
    /// Maximum steps per response
    pub max_steps: u32,
    /// Wall-clock ceiling per response
    pub timeout: Duration,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            timeout: DEFAULT_TURN_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    pub turn: TurnConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source; unset variables take defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = TurnConfig::default();

        let port = parse_var(&lookup, "STARGAZER_PORT", "a port number", DEFAULT_PORT, |p: &u16| {
            *p > 0
        })?;
        let max_steps = parse_var(
            &lookup,
            "STARGAZER_MAX_STEPS",
            "a positive integer",
            defaults.max_steps,
            |n: &u32| *n >= 1,
        )?;
        let timeout_secs = parse_var(
            &lookup,
            "STARGAZER_TURN_TIMEOUT_SECS",
            "a number of seconds between 1 and 86400",
            defaults.timeout.as_secs(),
            |s: &u64| (1..=MAX_TURN_TIMEOUT.as_secs()).contains(s),
        )?;

        Ok(Self {
            port,
            turn: TurnConfig {
                max_steps,
                timeout: Duration::from_secs(timeout_secs),
            },
        })
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    expected: &'static str,
    default: T,
    accept: impl Fn(&T) -> bool,
) -> Result<T, ConfigError> {
    let Some(raw) = lookup(var) else {
        return Ok(default);
    };
    raw.trim()
        .parse::<T>()
        .ok()
        .filter(|v| accept(v))
        .ok_or(ConfigError::Invalid {
            var,
            expected,
            value: raw,
        })
}
