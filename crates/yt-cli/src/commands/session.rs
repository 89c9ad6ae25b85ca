//! Start, stop and toggle commands.
//!
//! A running timer is an entry in `running.json`; its intervals are only
//! touched when it stops. Stopping sorts the timer's intervals and runs the
//! stop cascade as a final stop.

use std::io::Write;

use anyhow::{Context, Result};
use yt_core::{DataFile, IntervalStore, MergeSettings, RecordedStop, StopAction, Timer};
use yt_storage::{RunningTimers, Storage};

use super::util::{format_clock, require_timer, require_timer_mut};
use crate::Config;

/// Closes `title`'s open session at `at`, if it has one.
///
/// Only the in-memory `data` and `running` are changed; the caller saves.
pub(crate) fn stop_running(
    data: &mut DataFile,
    running: &mut RunningTimers,
    title: &str,
    at: f64,
    merge: &MergeSettings,
) -> Result<Option<RecordedStop>> {
    let Some(start) = running.start_of(title) else {
        return Ok(None);
    };
    let timer = require_timer_mut(data, title)?;
    timer.intervals.sort_intervals();
    let recorded = timer
        .intervals
        .record_stop(Some(start), at, merge, true)
        .with_context(|| format!("failed to record stop of {title}"))?;
    running.stop(title);
    Ok(recorded)
}

/// `timer`'s intervals as they would be if it were ticked at `at`.
///
/// Runs a non-final stop on a copy, so the open session shows up without
/// anything being recorded. Returns the session's tick result when running.
/// A session that has not begun by `at` counts as not running.
pub(crate) fn live_intervals(
    timer: &Timer,
    running: &RunningTimers,
    at: f64,
    merge: &MergeSettings,
) -> Result<(IntervalStore, Option<RecordedStop>)> {
    let mut intervals = timer.intervals.clone();
    intervals.sort_intervals();
    let open = running.start_of(&timer.title).filter(|&start| start <= at);
    let tick = intervals
        .record_stop(open, at, merge, false)
        .with_context(|| format!("{} was started after the requested time", timer.title))?;
    Ok((intervals, tick))
}

fn describe_stop(title: &str, at: f64, recorded: &RecordedStop) -> String {
    let length = format_clock(at - recorded.effective_start);
    if recorded.removed_short {
        return format!("Stopped {title}: discarded {length} session as too short");
    }
    let how = match recorded.action {
        StopAction::Appended | StopAction::Refreshed => "",
        StopAction::MergedOverlap => " (merged with overlapping interval)",
        StopAction::MergedAdjacent => " (merged with previous interval)",
        StopAction::MergedContained => " (merged with later interval)",
    };
    format!("Stopped {title}: interval now {length}{how}")
}

/// Starts `title` at `at`, which may not be later than `now`.
///
/// With `pause_other_timers`, any other running timer is stopped at the same
/// instant first.
pub fn start<W: Write>(
    writer: &mut W,
    storage: &Storage,
    config: &Config,
    title: &str,
    at: f64,
    now: f64,
) -> Result<()> {
    if at > now {
        anyhow::bail!("cannot start {title} in the future");
    }
    let mut data = storage.load_data()?;
    let mut running = storage.load_running()?;
    require_timer(&data, title)?;
    if running.is_running(title) {
        anyhow::bail!("{title} is already running");
    }

    if config.pause_other_timers {
        let others: Vec<String> = running.iter().map(|(t, _)| t.to_string()).collect();
        for other in others {
            if let Some(recorded) =
                stop_running(&mut data, &mut running, &other, at, &config.merge)?
            {
                writeln!(writer, "{}", describe_stop(&other, at, &recorded))?;
            }
        }
    }

    require_timer_mut(&mut data, title)?.intervals.sort_intervals();
    running.start(title, at);

    storage.save_data(&data)?;
    storage.save_running(&running)?;
    tracing::info!(title, at, "started timer");
    writeln!(writer, "Started {title}")?;
    Ok(())
}

/// Stops `title` at `at` and records the session.
pub fn stop<W: Write>(
    writer: &mut W,
    storage: &Storage,
    config: &Config,
    title: &str,
    at: f64,
) -> Result<()> {
    let mut data = storage.load_data()?;
    let mut running = storage.load_running()?;
    require_timer(&data, title)?;

    let Some(recorded) = stop_running(&mut data, &mut running, title, at, &config.merge)? else {
        anyhow::bail!("{title} is not running");
    };

    storage.save_data(&data)?;
    storage.save_running(&running)?;
    tracing::info!(title, at, action = ?recorded.action, "stopped timer");
    writeln!(writer, "{}", describe_stop(title, at, &recorded))?;
    Ok(())
}

pub fn toggle<W: Write>(
    writer: &mut W,
    storage: &Storage,
    config: &Config,
    title: &str,
    at: f64,
    now: f64,
) -> Result<()> {
    if storage.load_running()?.is_running(title) {
        stop(writer, storage, config, title, at)
    } else {
        start(writer, storage, config, title, at, now)
    }
}
