//! Export command for writing a CSV timesheet.
//!
//! Rows are built first; the CSV is written next; only after the write
//! succeeds are the exported intervals marked and the data file saved.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone};
use yt_core::csv::write_csv;
use yt_core::{ExportSettings, build_rows, commit_export};
use yt_storage::Storage;

use crate::Config;
use crate::cli::ExportArgs;

/// Applies command-line switches on top of the configured settings.
pub fn effective_settings(configured: &ExportSettings, args: &ExportArgs) -> ExportSettings {
    let mut settings = configured.clone();
    settings.export_all |= args.all;
    settings.export_full_rows &= !args.no_full;
    settings.export_summary_rows &= !args.no_summary;
    settings.mark_exported &= !args.no_mark;
    settings
}

pub fn run<W: Write, Tz: TimeZone>(
    writer: &mut W,
    storage: &Storage,
    config: &Config,
    args: &ExportArgs,
    now: &DateTime<Tz>,
) -> Result<()>
where
    Tz::Offset: fmt::Display,
{
    let settings = effective_settings(&config.export, args);
    let mut data = storage.load_data()?;
    for (title, _) in storage.load_running()?.iter() {
        tracing::warn!(title, "timer is running; its open session is not exported");
    }

    let rows = build_rows(&data.timerdata, &settings, &now.timezone())
        .context("invalid export settings")?;
    if rows.is_empty() {
        if !args.stdout {
            writeln!(writer, "Nothing to export.")?;
        }
        return Ok(());
    }

    if args.stdout {
        write_csv(writer, &rows, &settings)?;
    } else {
        let dir = args.dir.as_deref().unwrap_or_else(|| config.export_dir());
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        let path = dir.join(settings.export_filename(now));
        let file =
            File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;
        let mut out = BufWriter::new(file);
        write_csv(&mut out, &rows, &settings)
            .and_then(|()| out.flush())
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), rows = rows.len(), "wrote export");
        writeln!(writer, "Wrote {} rows to {}", rows.len(), path.display())?;
    }

    if settings.mark_exported {
        let marked = commit_export(&mut data.timerdata);
        storage.save_data(&data)?;
        if !args.stdout {
            writeln!(writer, "Marked {marked} intervals exported")?;
        }
    }
    Ok(())
}
