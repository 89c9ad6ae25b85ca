//! Shared utilities for CLI commands.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use regex::Regex;
use yt_core::{DataFile, Timer};

/// Pre-compiled regex for relative time parsing.
static RELATIVE_TIME_RE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+(second|minute|hour|day|week)s?\s+ago$"));

/// Conservative bounds for relative time parsing (~1000 years in seconds).
const MAX_RELATIVE_SECONDS: i64 = 1000 * 365 * 24 * 60 * 60;

/// Parse a datetime string as either RFC 3339 or relative time.
///
/// Supports:
/// - RFC 3339: "2026-01-15T10:30:00Z"
/// - Relative: "90 seconds ago", "30 minutes ago", "2 hours ago", "1 day ago"
pub fn parse_datetime(s: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let re = RELATIVE_TIME_RE
        .as_ref()
        .map_err(Clone::clone)
        .context("failed to build relative time pattern")?;
    let Some(caps) = re.captures(s.trim()) else {
        anyhow::bail!(
            "Invalid time: {s}. Use RFC 3339 (e.g., 2026-01-15T10:30:00Z) or relative (e.g., '10 minutes ago')"
        );
    };

    let n: i64 = caps[1]
        .parse()
        .context("failed to parse number in relative time")?;

    let secs_per_unit = match &caps[2] {
        "second" => 1,
        "minute" => 60,
        "hour" => 60 * 60,
        "day" => 24 * 60 * 60,
        "week" => 7 * 24 * 60 * 60,
        unit => anyhow::bail!("Unknown time unit: {unit}"),
    };

    if n > MAX_RELATIVE_SECONDS / secs_per_unit {
        anyhow::bail!("Relative time value too large: {n} {}", &caps[2]);
    }

    Ok(now - Duration::seconds(n * secs_per_unit))
}

/// Resolves an optional `--at` argument, defaulting to `now`.
pub fn resolve_when(at: Option<&str>, now: DateTime<Utc>) -> Result<f64> {
    let when = match at {
        Some(s) => parse_datetime(s, now)?,
        None => now,
    };
    Ok(epoch_secs(&when))
}

/// Unix seconds with millisecond precision.
#[expect(
    clippy::cast_precision_loss,
    reason = "millisecond timestamps are exact in f64 for the next 280,000 years"
)]
pub fn epoch_secs<Tz: TimeZone>(dt: &DateTime<Tz>) -> f64 {
    dt.timestamp_millis() as f64 / 1000.0
}

/// Converts Unix seconds into `tz`, or `None` outside chrono's range.
#[expect(
    clippy::cast_possible_truncation,
    reason = "out-of-range values saturate and are rejected by chrono"
)]
pub fn from_epoch<Tz: TimeZone>(secs: f64, tz: &Tz) -> Option<DateTime<Tz>> {
    DateTime::from_timestamp_millis((secs * 1000.0).round() as i64).map(|dt| dt.with_timezone(tz))
}

/// Formats seconds as `HH:MM:SS`; hours are not capped at 24.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "negative and fractional seconds are clamped and floored first"
)]
pub fn format_clock(secs: f64) -> String {
    let total = secs.max(0.0).floor() as u64;
    format!("{:02}:{:02}:{:02}", total / 3600, (total / 60) % 60, total % 60)
}

/// Looks up a timer by title.
pub fn require_timer<'a>(data: &'a DataFile, title: &str) -> Result<&'a Timer> {
    data.timer(title)
        .with_context(|| format!("no timer named {title:?}. Run 'yt list' to see timers."))
}

/// Looks up a timer by title for editing.
pub fn require_timer_mut<'a>(data: &'a mut DataFile, title: &str) -> Result<&'a mut Timer> {
    data.timer_mut(title)
        .with_context(|| format!("no timer named {title:?}. Run 'yt list' to see timers."))
}
