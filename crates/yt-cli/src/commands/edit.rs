//! Commands for editing a timer.
//!
//! `edit` changes a timer's title, description or source system. `note` and
//! `set-intervals` change a stopped timer's intervals.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use yt_core::Interval;
use yt_storage::Storage;

use super::util::{require_timer, require_timer_mut};

fn ensure_stopped(storage: &Storage, title: &str) -> Result<()> {
    if storage.load_running()?.is_running(title) {
        anyhow::bail!("{title} is running; stop it before editing its intervals");
    }
    Ok(())
}

/// New values for a timer's identity fields; `None` leaves a field as is.
#[derive(Debug, Default)]
pub struct TimerChanges<'a> {
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub source: Option<&'a str>,
}

/// Applies `changes` to `title`.
///
/// A rename keeps a running session: its `running.json` entry moves to the
/// new title.
pub fn edit<W: Write>(
    writer: &mut W,
    storage: &Storage,
    title: &str,
    changes: &TimerChanges<'_>,
) -> Result<()> {
    let mut data = storage.load_data()?;
    let mut running = storage.load_running()?;
    require_timer(&data, title)?;

    let rename = changes.title.filter(|new| *new != title);
    if let Some(new) = rename {
        if new.trim().is_empty() {
            anyhow::bail!("timer title cannot be empty");
        }
        if data.timer(new).is_some() {
            anyhow::bail!("a timer named {new:?} already exists");
        }
    }

    let timer = require_timer_mut(&mut data, title)?;
    if let Some(description) = changes.description {
        timer.description = description.to_string();
    }
    if let Some(source) = changes.source {
        timer.source_system = source.to_string();
    }
    if let Some(new) = rename {
        timer.title = new.to_string();
    }

    storage.save_data(&data)?;
    if let Some(new) = rename {
        if let Some(start) = running.stop(title) {
            running.start(new, start);
            storage.save_running(&running)?;
        }
    }

    let current = rename.unwrap_or(title);
    tracing::info!(title, current, "edited timer");
    writeln!(writer, "Updated timer {current}")?;
    Ok(())
}

/// Sets the note of interval `index` (as numbered by `yt show`).
pub fn note<W: Write>(
    writer: &mut W,
    storage: &Storage,
    title: &str,
    index: usize,
    text: &str,
) -> Result<()> {
    ensure_stopped(storage, title)?;
    let mut data = storage.load_data()?;
    require_timer_mut(&mut data, title)?
        .intervals
        .set_note(index, text)
        .with_context(|| format!("cannot set note on {title}"))?;
    storage.save_data(&data)?;
    writeln!(writer, "Updated note on {title} interval {index}")?;
    Ok(())
}

/// Replaces a timer's intervals with the JSON array in `file`.
pub fn set_intervals<W: Write>(
    writer: &mut W,
    storage: &Storage,
    title: &str,
    file: &Path,
) -> Result<()> {
    ensure_stopped(storage, title)?;
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let intervals: Vec<Interval> = serde_json::from_str(&content)
        .with_context(|| format!("invalid interval list in {}", file.display()))?;

    let mut data = storage.load_data()?;
    let count = intervals.len();
    let previous = require_timer_mut(&mut data, title)?
        .intervals
        .replace_all(intervals);
    storage.save_data(&data)?;
    tracing::info!(title, previous = previous.len(), count, "replaced intervals");
    writeln!(writer, "Replaced {} intervals on {title} with {count}", previous.len())?;
    Ok(())
}
