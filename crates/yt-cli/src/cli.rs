//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Interval-tracking timers.
///
/// Start and stop named timers, then roll the recorded intervals up into a
/// CSV timesheet.
#[derive(Debug, Parser)]
#[command(name = "yt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Add a timer.
    Add {
        /// Timer title, usually a ticket number.
        title: String,

        /// What the work is about.
        #[arg(short, long, default_value = "")]
        description: String,

        /// Ticket system the time is reported against.
        #[arg(short, long, default_value = "yt")]
        source: String,
    },

    /// List timers with their unexported time.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Start a timer.
    Start(WhenArgs),

    /// Stop a running timer and record the session.
    Stop(WhenArgs),

    /// Start a timer if it is stopped, stop it if it is running.
    Toggle(WhenArgs),

    /// Show running timers without recording anything.
    Status {
        /// Report as of this time instead of now.
        #[arg(long)]
        at: Option<String>,
    },

    /// Show a timer's intervals.
    Show {
        title: String,
    },

    /// Change a timer's title, description or source system.
    Edit {
        title: String,

        /// New title.
        #[arg(long = "title", value_name = "NEW_TITLE")]
        new_title: Option<String>,

        /// New description.
        #[arg(short, long)]
        description: Option<String>,

        /// New source system.
        #[arg(short, long)]
        source: Option<String>,
    },

    /// Set the note of one interval (index as shown by `yt show`).
    Note {
        title: String,
        index: usize,
        text: String,
    },

    /// Replace a timer's intervals with a JSON array of
    /// `[start, end, exported, note]` tuples.
    SetIntervals {
        title: String,
        file: PathBuf,
    },

    /// Sort timers by title.
    Sort,

    /// Write unexported intervals to a CSV timesheet.
    Export(ExportArgs),

    /// Move intervals out of the data file into per-timer archive files.
    ///
    /// Without --timer, archives every exported interval. With --timer,
    /// archives all of that timer's intervals and removes the timer.
    Archive {
        #[arg(long)]
        timer: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct WhenArgs {
    pub title: String,

    /// When it happened: RFC 3339 or relative ("10 minutes ago"). Default: now.
    #[arg(long)]
    pub at: Option<String>,
}

#[derive(Debug, Default, Args)]
pub struct ExportArgs {
    /// Include intervals that were already exported.
    #[arg(long)]
    pub all: bool,

    /// Leave out per-interval rows.
    #[arg(long)]
    pub no_full: bool,

    /// Leave out per-day summary rows.
    #[arg(long)]
    pub no_summary: bool,

    /// Do not mark the exported intervals.
    #[arg(long)]
    pub no_mark: bool,

    /// Directory to write the CSV file to.
    #[arg(long, conflicts_with = "stdout")]
    pub dir: Option<PathBuf>,

    /// Write the CSV to standard output instead of a file.
    #[arg(long)]
    pub stdout: bool,
}
