//! Show command for listing one timer's intervals.

use std::fmt::{self, Write as _};
use std::io::Write;

use anyhow::Result;
use chrono::TimeZone;
use yt_core::Timer;
use yt_storage::Storage;

use super::util::{format_clock, from_epoch, require_timer};

fn format_local<Tz: TimeZone>(secs: f64, tz: &Tz, fmt: &str) -> String
where
    Tz::Offset: fmt::Display,
{
    from_epoch(secs, tz).map_or_else(|| secs.to_string(), |dt| dt.format(fmt).to_string())
}

pub fn format_timer<Tz: TimeZone>(timer: &Timer, running_since: Option<f64>, tz: &Tz) -> String
where
    Tz::Offset: fmt::Display,
{
    let mut output = String::new();
    let _ = writeln!(output, "{} ({})", timer.title, timer.source_system);
    if !timer.description.is_empty() {
        let _ = writeln!(output, "{}", timer.description);
    }
    if let Some(start) = running_since {
        let _ = writeln!(
            output,
            "Running since {}",
            format_local(start, tz, "%Y-%m-%d %H:%M:%S")
        );
    }
    let _ = writeln!(output);

    if timer.intervals.is_empty() {
        output.push_str("No intervals recorded.\n");
        return output;
    }

    let _ = writeln!(
        output,
        "{:>3}  {:<10}  {:<8}  {:<8}  {:>8}  {:<8}  Note",
        "#", "Date", "Start", "End", "Length", "Exported"
    );
    for (index, interval) in timer.intervals.intervals().iter().enumerate() {
        let line = format!(
            "{index:>3}  {:<10}  {:<8}  {:<8}  {:>8}  {:<8}  {}",
            format_local(interval.start(), tz, "%Y-%m-%d"),
            format_local(interval.start(), tz, "%H:%M:%S"),
            format_local(interval.end(), tz, "%H:%M:%S"),
            format_clock(interval.duration_secs()),
            if interval.exported { "yes" } else { "no" },
            interval.note,
        );
        output.push_str(line.trim_end());
        output.push('\n');
    }
    output
}

pub fn run<W: Write, Tz: TimeZone>(
    writer: &mut W,
    storage: &Storage,
    title: &str,
    tz: &Tz,
) -> Result<()>
where
    Tz::Offset: fmt::Display,
{
    let data = storage.load_data()?;
    let running = storage.load_running()?;
    let timer = require_timer(&data, title)?;
    write!(writer, "{}", format_timer(timer, running.start_of(title), tz))?;
    Ok(())
}
