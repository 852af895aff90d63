//! Runtime configuration.
//!
//! Settings come from three layers, highest precedence first:
//!
//! | Layer | Source |
//! |-------|--------|
//! | Environment | `STOCKWATCH_*` variables |
//! | Settings file | `.stockwatch-settings.json` next to `stocks.json` |
//! | Built-in | [`RuntimeConfig::default`] |
//!
//! [`resolve`] folds them into one immutable [`RuntimeConfig`] per cycle.
//! A malformed value in any layer is logged and skipped, so the next layer
//! down applies.
//!
//! # Environment Variables
//!
//! | Variable | Example |
//! |----------|---------|
//! | `STOCKWATCH_ALLOW_DELAYED` | `1` |
//! | `STOCKWATCH_REMINDER_INTERVAL` | `2h` |
//! | `STOCKWATCH_POLL_INTERVAL` | `10m` |
//! | `STOCKWATCH_POLL_NEAR_INTERVAL` | `2m` |
//! | `STOCKWATCH_NEAR_THRESHOLD_PERCENT` | `1.5` |

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::ValidationError;

pub const ENV_ALLOW_DELAYED: &str = "STOCKWATCH_ALLOW_DELAYED";
pub const ENV_REMINDER_INTERVAL: &str = "STOCKWATCH_REMINDER_INTERVAL";
pub const ENV_POLL_INTERVAL: &str = "STOCKWATCH_POLL_INTERVAL";
pub const ENV_POLL_NEAR_INTERVAL: &str = "STOCKWATCH_POLL_NEAR_INTERVAL";
pub const ENV_NEAR_THRESHOLD_PERCENT: &str = "STOCKWATCH_NEAR_THRESHOLD_PERCENT";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_POLL_NEAR_INTERVAL: Duration = Duration::from_secs(2 * 60);
pub const DEFAULT_NEAR_THRESHOLD_PERCENT: f64 = 2.0;

/// Settings record as stored on disk. Every field is optional; durations are
/// strings such as `"90s"`, `"10m"` or `"1h30m"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_delayed_fallback: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_interval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_near_interval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub near_threshold_percent: Option<f64>,
}

/// Fully resolved settings for one cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuntimeConfig {
    pub allow_delayed_fallback: bool,
    /// Zero disables reminders.
    pub reminder_interval: Duration,
    pub poll_interval: Duration,
    pub poll_near_interval: Duration,
    pub near_threshold_percent: f64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            allow_delayed_fallback: false,
            reminder_interval: Duration::ZERO,
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_near_interval: DEFAULT_POLL_NEAR_INTERVAL,
            near_threshold_percent: DEFAULT_NEAR_THRESHOLD_PERCENT,
        }
    }
}

/// Resolve configuration with `env` as the variable lookup.
pub fn resolve<F>(settings: &SettingsFile, env: F) -> RuntimeConfig
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = RuntimeConfig::default();
    let lookup = |name: &str| env(name).filter(|value| !value.trim().is_empty());

    let allow_delayed_fallback = lookup(ENV_ALLOW_DELAYED)
        .and_then(|raw| overridden(ENV_ALLOW_DELAYED, parse_bool(&raw)))
        .or(settings.allow_delayed_fallback)
        .unwrap_or(defaults.allow_delayed_fallback);

    // Zero is meaningful here: it switches reminders off.
    let reminder_interval = lookup(ENV_REMINDER_INTERVAL)
        .and_then(|raw| overridden(ENV_REMINDER_INTERVAL, parse_duration(&raw)))
        .or_else(|| settings_duration("reminderInterval", settings.reminder_interval.as_deref()))
        .unwrap_or(defaults.reminder_interval);

    let poll_interval = nonzero(
        lookup(ENV_POLL_INTERVAL)
            .and_then(|raw| overridden(ENV_POLL_INTERVAL, parse_duration(&raw))),
    )
    .or_else(|| nonzero(settings_duration("pollInterval", settings.poll_interval.as_deref())))
    .unwrap_or(defaults.poll_interval);

    let poll_near_interval = nonzero(
        lookup(ENV_POLL_NEAR_INTERVAL)
            .and_then(|raw| overridden(ENV_POLL_NEAR_INTERVAL, parse_duration(&raw))),
    )
    .or_else(|| {
        nonzero(settings_duration(
            "pollNearInterval",
            settings.poll_near_interval.as_deref(),
        ))
    })
    .unwrap_or(defaults.poll_near_interval);

    let near_threshold_percent = lookup(ENV_NEAR_THRESHOLD_PERCENT)
        .and_then(|raw| overridden(ENV_NEAR_THRESHOLD_PERCENT, parse_percentage(&raw)))
        .filter(|percent| *percent > 0.0)
        .or_else(|| {
            settings
                .near_threshold_percent
                .filter(|percent| percent.is_finite() && *percent > 0.0)
        })
        .unwrap_or(defaults.near_threshold_percent);

    RuntimeConfig {
        allow_delayed_fallback,
        reminder_interval,
        poll_interval,
        poll_near_interval,
        near_threshold_percent,
    }
}

/// [`resolve`] against the process environment.
pub fn resolve_from_env(settings: &SettingsFile) -> RuntimeConfig {
    resolve(settings, |name| std::env::var(name).ok())
}

fn overridden<T>(name: &str, parsed: Result<T, ValidationError>) -> Option<T> {
    match parsed {
        Ok(value) => Some(value),
        Err(error) => {
            warn!(variable = name, %error, "ignoring malformed environment override");
            None
        }
    }
}

fn settings_duration(field: &str, raw: Option<&str>) -> Option<Duration> {
    let raw = raw.map(str::trim).filter(|value| !value.is_empty())?;
    match parse_duration(raw) {
        Ok(duration) => Some(duration),
        Err(error) => {
            warn!(field, %error, "ignoring malformed settings value");
            None
        }
    }
}

fn nonzero(duration: Option<Duration>) -> Option<Duration> {
    duration.filter(|duration| !duration.is_zero())
}

/// Parse durations such as `90s`, `10m`, `1h30m`, `500ms` or `1.5h`.
///
/// A bare `0` is accepted as zero.
pub fn parse_duration(raw: &str) -> Result<Duration, ValidationError> {
    let invalid = || ValidationError::InvalidDuration {
        value: raw.to_owned(),
    };
    let input = raw.trim();
    if input.is_empty() {
        return Err(invalid());
    }
    if input == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total_secs = 0.0_f64;
    let mut rest = input;
    while !rest.is_empty() {
        let number_len = rest
            .find(|ch: char| !(ch.is_ascii_digit() || ch == '.'))
            .ok_or_else(invalid)?;
        if number_len == 0 {
            return Err(invalid());
        }
        let value: f64 = rest[..number_len].parse().map_err(|_| invalid())?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|ch: char| ch.is_ascii_digit() || ch == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_len] {
            "ms" => 0.001,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3_600.0,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];
        total_secs += value * scale;
    }

    Duration::try_from_secs_f64(total_secs).map_err(|_| invalid())
}

/// Accepts `1/0`, `true/false`, `yes/no`, `on/off` in any case.
pub fn parse_bool(raw: &str) -> Result<bool, ValidationError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ValidationError::InvalidBool {
            value: raw.to_owned(),
        }),
    }
}

/// Non-negative finite number, with an optional trailing `%`.
pub fn parse_percentage(raw: &str) -> Result<f64, ValidationError> {
    let trimmed = raw.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    number
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value >= 0.0)
        .ok_or_else(|| ValidationError::InvalidPercentage {
            value: raw.to_owned(),
        })
}
