//! Archive command for moving intervals out of the data file.

use std::io::Write;

use anyhow::{Context, Result};
use yt_core::Interval;
use yt_storage::Storage;

use super::session::stop_running;
use super::util::require_timer;
use crate::Config;

/// Moves every timer's exported intervals into its archive file.
///
/// A timer whose archive cannot be written keeps its intervals; the others
/// are still archived and saved, and the command then fails.
pub fn archive_exported<W: Write>(writer: &mut W, storage: &Storage) -> Result<()> {
    let mut data = storage.load_data()?;
    let mut archived = 0;
    let mut timers = 0;
    let mut failed = Vec::new();

    for timer in &mut data.timerdata {
        let exported: Vec<Interval> = timer
            .intervals
            .intervals()
            .iter()
            .filter(|i| i.exported)
            .cloned()
            .collect();
        if exported.is_empty() {
            continue;
        }
        match storage.append_archive(timer, exported) {
            Ok(count) => {
                timer.intervals.take_exported();
                archived += count;
                timers += 1;
            }
            Err(err) => {
                tracing::warn!(title = %timer.title, error = %err, "failed to archive intervals");
                failed.push(timer.title.clone());
            }
        }
    }

    if timers > 0 {
        storage.save_data(&data)?;
    }
    writeln!(writer, "Archived {archived} intervals from {timers} timers")?;
    if !failed.is_empty() {
        anyhow::bail!(
            "failed to archive intervals for {} timers: {}",
            failed.len(),
            failed.join(", ")
        );
    }
    Ok(())
}

/// Stops `title` if it is running, moves all of its intervals into its
/// archive file and removes it from the data file.
pub fn archive_timer<W: Write>(
    writer: &mut W,
    storage: &Storage,
    config: &Config,
    title: &str,
    at: f64,
) -> Result<()> {
    let mut data = storage.load_data()?;
    let mut running = storage.load_running()?;
    require_timer(&data, title)?;
    let was_running = stop_running(&mut data, &mut running, title, at, &config.merge)?.is_some();

    let timer = require_timer(&data, title)?;
    let count = storage
        .append_archive(timer, timer.intervals.intervals().to_vec())
        .with_context(|| format!("failed to archive {title}; the timer was kept"))?;

    data.timerdata.retain(|t| t.title != title);
    storage.save_data(&data)?;
    if was_running {
        storage.save_running(&running)?;
    }
    tracing::info!(title, count, "archived timer");
    writeln!(writer, "Archived {title} with {count} intervals")?;
    Ok(())
}
