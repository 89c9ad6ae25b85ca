//! List command for showing timers with their unexported time.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::Result;
use serde::Serialize;
use yt_core::{DataFile, MergeSettings};
use yt_storage::{RunningTimers, Storage};

use super::session::live_intervals;
use super::util::format_clock;

/// One timer as listed.
#[derive(Debug, Clone, Serialize)]
pub struct ListEntry {
    pub title: String,
    pub description: String,
    pub source: String,
    pub running: bool,
    /// Unexported time in seconds, including an open session.
    pub unexported_secs: f64,
    pub intervals: usize,
}

pub fn collect_entries(
    data: &DataFile,
    running: &RunningTimers,
    now: f64,
    merge: &MergeSettings,
) -> Result<Vec<ListEntry>> {
    data.timerdata
        .iter()
        .map(|timer| {
            let (live, _) = live_intervals(timer, running, now, merge)?;
            Ok(ListEntry {
                title: timer.title.clone(),
                description: timer.description.clone(),
                source: timer.source_system.clone(),
                running: running.is_running(&timer.title),
                unexported_secs: live.total_elapsed(None, true),
                intervals: timer.intervals.len(),
            })
        })
        .collect()
}

pub fn format_entries(entries: &[ListEntry]) -> String {
    let mut output = String::new();
    if entries.is_empty() {
        output.push_str("No timers. Add one with 'yt add TITLE'.\n");
        return output;
    }

    let width = entries
        .iter()
        .map(|e| e.title.chars().count())
        .max()
        .unwrap_or(0)
        .max("Title".len());
    let _ = writeln!(
        output,
        "  {:<width$}  {:<8}  {:>10}  Description",
        "Title", "Source", "Unexported"
    );
    for entry in entries {
        let marker = if entry.running { '*' } else { ' ' };
        let line = format!(
            "{marker} {:<width$}  {:<8}  {:>10}  {}",
            entry.title,
            entry.source,
            format_clock(entry.unexported_secs),
            entry.description
        );
        output.push_str(line.trim_end());
        output.push('\n');
    }
    output
}

pub fn run<W: Write>(
    writer: &mut W,
    storage: &Storage,
    merge: &MergeSettings,
    now: f64,
    json: bool,
) -> Result<()> {
    let data = storage.load_data()?;
    let running = storage.load_running()?;
    let entries = collect_entries(&data, &running, now, merge)?;

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&entries)?)?;
    } else {
        write!(writer, "{}", format_entries(&entries))?;
    }
    Ok(())
}
