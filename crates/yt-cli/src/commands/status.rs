//! Status command for showing running timers.
//!
//! Each running timer is ticked on a copy, the way a live display refreshes
//! its current interval, so merges are reflected without anything being
//! written.

use std::io::Write;

use anyhow::Result;
use yt_core::MergeSettings;
use yt_storage::Storage;

use super::session::live_intervals;
use super::util::{format_clock, require_timer};

pub fn run<W: Write>(
    writer: &mut W,
    storage: &Storage,
    merge: &MergeSettings,
    at: f64,
) -> Result<()> {
    let data = storage.load_data()?;
    let running = storage.load_running()?;

    if running.is_empty() {
        writeln!(writer, "No timers running.")?;
        return Ok(());
    }

    for (title, _) in running.iter() {
        let timer = require_timer(&data, title)?;
        let (live, tick) = live_intervals(timer, &running, at, merge)?;
        let current = tick.map_or(0.0, |tick| at - tick.effective_start);
        writeln!(
            writer,
            "{title}: current interval {}, unexported total {}",
            format_clock(current),
            format_clock(live.total_elapsed(Some(at), true)),
        )?;
    }
    Ok(())
}
