//! Export aggregation.
//!
//! Turns timers' intervals into CSV-ready rows: one Full row per selected
//! interval and one Summary row per (source, title, description, start date)
//! group, each with a templated duration. Building rows is pure; marking the
//! intervals exported is a separate step ([`commit_export`]) the caller runs
//! once the CSV has been written.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::interval::Interval;
use crate::template::{DurationParts, DurationTemplate, TemplateError};
use crate::timer::Timer;

/// Configuration errors that stop an export before any row is produced.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExportError {
    #[error("{which} duration template: {source}")]
    Template {
        which: &'static str,
        #[source]
        source: TemplateError,
    },

    #[error("invalid {which} format {format:?}")]
    InvalidTimeFormat { which: &'static str, format: String },

    #[error("rounding increment must be a positive number, got {0}")]
    InvalidRoundingIncrement(f64),

    #[error("timestamp {0} is outside the representable date range")]
    TimestampOutOfRange(f64),
}

/// A column an export can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Type,
    Source,
    PreviousExport,
    Title,
    Description,
    StartDate,
    StartTime,
    EndTime,
    Duration,
    Task,
}

impl Column {
    pub const ALL: [Self; 10] = [
        Self::Type,
        Self::Source,
        Self::PreviousExport,
        Self::Title,
        Self::Description,
        Self::StartDate,
        Self::StartTime,
        Self::EndTime,
        Self::Duration,
        Self::Task,
    ];

    /// Key used in settings.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Type => "type",
            Self::Source => "source",
            Self::PreviousExport => "previousexport",
            Self::Title => "title",
            Self::Description => "description",
            Self::StartDate => "startdate",
            Self::StartTime => "starttime",
            Self::EndTime => "endtime",
            Self::Duration => "duration",
            Self::Task => "task",
        }
    }

    /// Header text used when the settings name none.
    pub const fn default_display_name(self) -> &'static str {
        match self {
            Self::Type => "Full/Summary",
            Self::Source => "Source",
            Self::PreviousExport => "Already Exported?",
            Self::Title => "Ticket Title",
            Self::Description => "Ticket Description",
            Self::StartDate => "Work Date",
            Self::StartTime => "Start Time",
            Self::EndTime => "End Time",
            Self::Duration => "Duration",
            Self::Task => "Work Description",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a column key is not one of [`Column::ALL`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown export column: {0}")]
pub struct UnknownColumn(pub String);

impl FromStr for Column {
    type Err = UnknownColumn;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownColumn(s.to_string()))
    }
}

/// Settings for building and writing an export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Include intervals that were already exported.
    pub export_all: bool,
    /// Mark the selected intervals exported after a successful write.
    pub mark_exported: bool,
    pub export_full_rows: bool,
    pub export_summary_rows: bool,
    /// File name template; `{timestamp}` and `{fullsummary}` are substituted.
    pub filename: String,
    pub date_format: String,
    pub time_format: String,
    /// Increment `{roundedhours}` rounds to. Default: 0.25.
    pub rounding_increment: f64,
    pub full_duration: String,
    pub summary_duration: String,
    pub export_columns: Vec<String>,
    pub sort_columns: Vec<String>,
    /// Header text per column key.
    pub column_names: BTreeMap<String, String>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            export_all: false,
            mark_exported: true,
            export_full_rows: true,
            export_summary_rows: true,
            filename: "yt-export-{timestamp}-{fullsummary}.csv".to_string(),
            date_format: "%Y-%m-%d".to_string(),
            time_format: "%H:%M".to_string(),
            rounding_increment: 0.25,
            full_duration: "{inthours}h {intminutes}m".to_string(),
            summary_duration: "{roundedhours}".to_string(),
            export_columns: Column::ALL.iter().map(|c| c.as_str().to_string()).collect(),
            sort_columns: [
                Column::Type,
                Column::StartDate,
                Column::Source,
                Column::Title,
                Column::StartTime,
            ]
            .iter()
            .map(|c| c.as_str().to_string())
            .collect(),
            column_names: Column::ALL
                .iter()
                .map(|c| (c.as_str().to_string(), c.default_display_name().to_string()))
                .collect(),
        }
    }
}

impl ExportSettings {
    /// Header text for a column key.
    pub fn display_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.column_names.get(key).map_or(key, String::as_str)
    }

    /// `full`, `summary` or `fullsummary`, for the file name template.
    pub const fn row_selection_label(&self) -> &'static str {
        match (self.export_full_rows, self.export_summary_rows) {
            (true, false) => "full",
            (false, true) => "summary",
            _ => "fullsummary",
        }
    }

    /// Export file name for an export taken at `now`.
    pub fn export_filename<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> String
    where
        Tz::Offset: fmt::Display,
    {
        let timestamp = now.format("%Y%m%d%H%M%S").to_string();
        self.filename
            .replace("{timestamp}", &timestamp)
            .replace("{fullsummary}", self.row_selection_label())
    }

    /// Resolves the export columns; unknown keys stay `None` and render empty.
    pub fn resolved_columns(&self) -> Vec<Option<Column>> {
        self.export_columns
            .iter()
            .map(|key| match key.parse::<Column>() {
                Ok(column) => Some(column),
                Err(err) => {
                    tracing::warn!(%err, "column will be exported empty");
                    None
                }
            })
            .collect()
    }

    /// Sort columns that are known and part of the export, in priority order.
    fn resolved_sort_columns(&self) -> Vec<Column> {
        self.sort_columns
            .iter()
            .filter(|key| self.export_columns.contains(key))
            .filter_map(|key| match key.parse::<Column>() {
                Ok(column) => Some(column),
                Err(err) => {
                    tracing::warn!(%err, "ignoring sort column");
                    None
                }
            })
            .collect()
    }

    fn compile(&self) -> Result<Plan, ExportError> {
        if !(self.rounding_increment.is_finite() && self.rounding_increment > 0.0) {
            return Err(ExportError::InvalidRoundingIncrement(
                self.rounding_increment,
            ));
        }
        check_strftime("date", &self.date_format)?;
        check_strftime("time", &self.time_format)?;
        let full = self
            .full_duration
            .parse()
            .map_err(|source| ExportError::Template {
                which: "full",
                source,
            })?;
        let summary = self
            .summary_duration
            .parse()
            .map_err(|source| ExportError::Template {
                which: "summary",
                source,
            })?;
        Ok(Plan { full, summary })
    }
}

fn check_strftime(which: &'static str, format: &str) -> Result<(), ExportError> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(ExportError::InvalidTimeFormat {
            which,
            format: format.to_string(),
        });
    }
    Ok(())
}

struct Plan {
    full: DurationTemplate,
    summary: DurationTemplate,
}

/// Whether a row describes one interval or a day's group of intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowKind {
    Full,
    Summary,
}

impl RowKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "Full",
            Self::Summary => "Summary",
        }
    }
}

impl fmt::Display for RowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rows sharing a key fold into one Summary row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub source: String,
    pub title: String,
    pub description: String,
    pub start_date: String,
}

/// One line of an export.
///
/// Summary rows leave `previous_export`, `start_time` and `end_time` empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub kind: RowKind,
    pub source: String,
    pub title: String,
    pub description: String,
    pub previous_export: Option<bool>,
    pub start_date: String,
    pub start_time: String,
    pub end_time: String,
    pub raw_hours: f64,
    pub duration: String,
    pub task: String,
}

impl ExportRow {
    /// Text of `column` in this row.
    pub fn cell(&self, column: Column) -> &str {
        match column {
            Column::Type => self.kind.as_str(),
            Column::Source => &self.source,
            Column::PreviousExport => match self.previous_export {
                Some(true) => "True",
                Some(false) => "False",
                None => "",
            },
            Column::Title => &self.title,
            Column::Description => &self.description,
            Column::StartDate => &self.start_date,
            Column::StartTime => &self.start_time,
            Column::EndTime => &self.end_time,
            Column::Duration => &self.duration,
            Column::Task => &self.task,
        }
    }

    fn group_key(&self) -> GroupKey {
        GroupKey {
            source: self.source.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            start_date: self.start_date.clone(),
        }
    }
}

struct Group {
    key: GroupKey,
    hours: f64,
    tasks: String,
}

impl Group {
    fn add_task(&mut self, task: &str) {
        if task.is_empty() {
            return;
        }
        if !self.tasks.is_empty() {
            self.tasks.push(' ');
        }
        self.tasks.push_str(task);
        if !self.tasks.ends_with(['.', ';']) {
            self.tasks.push('.');
        }
    }
}

fn selected(interval: &Interval, export_all: bool) -> bool {
    export_all || !interval.exported
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    reason = "range is checked before the casts"
)]
fn to_datetime<Tz: TimeZone>(tz: &Tz, timestamp: f64) -> Result<DateTime<Tz>, ExportError> {
    let secs = timestamp.floor();
    if !(secs.is_finite() && secs >= i64::MIN as f64 && secs < i64::MAX as f64) {
        return Err(ExportError::TimestampOutOfRange(timestamp));
    }
    let nanos = (((timestamp - secs) * 1e9) as u32).min(999_999_999);
    DateTime::<Utc>::from_timestamp(secs as i64, nanos)
        .map(|utc| utc.with_timezone(tz))
        .ok_or(ExportError::TimestampOutOfRange(timestamp))
}

/// Builds the export rows for `timers`, formatting dates and times in `tz`.
///
/// Intervals are selected when unexported, or always with `export_all`.
/// Full rows come in timer/interval order and Summary rows in the order
/// their group first appears; the combined list is then stable-sorted by
/// the sort columns that are also export columns.
pub fn build_rows<Tz: TimeZone>(
    timers: &[Timer],
    settings: &ExportSettings,
    tz: &Tz,
) -> Result<Vec<ExportRow>, ExportError>
where
    Tz::Offset: fmt::Display,
{
    let plan = settings.compile()?;
    let increment = settings.rounding_increment;

    let mut full_rows = Vec::new();
    let mut groups: Vec<Group> = Vec::new();
    let mut group_index: HashMap<GroupKey, usize> = HashMap::new();

    for timer in timers {
        for interval in timer
            .intervals
            .intervals()
            .iter()
            .filter(|i| selected(i, settings.export_all))
        {
            let start = to_datetime(tz, interval.start())?;
            let end = to_datetime(tz, interval.end())?;
            let raw_hours = interval.duration_secs() / 3600.0;
            let row = ExportRow {
                kind: RowKind::Full,
                source: timer.source_system.clone(),
                title: timer.title.clone(),
                description: timer.description.clone(),
                previous_export: Some(interval.exported),
                start_date: start.format(&settings.date_format).to_string(),
                start_time: start.format(&settings.time_format).to_string(),
                end_time: end.format(&settings.time_format).to_string(),
                raw_hours,
                duration: plan
                    .full
                    .render(&DurationParts::from_hours(raw_hours, increment)),
                task: interval.note.clone(),
            };

            let key = row.group_key();
            let index = *group_index.entry(key.clone()).or_insert_with(|| {
                groups.push(Group {
                    key,
                    hours: 0.0,
                    tasks: String::new(),
                });
                groups.len() - 1
            });
            groups[index].hours += raw_hours;
            groups[index].add_task(&row.task);

            full_rows.push(row);
        }
    }

    let mut rows = Vec::new();
    if settings.export_full_rows {
        rows.extend(full_rows);
    }
    if settings.export_summary_rows {
        rows.extend(groups.into_iter().map(|group| ExportRow {
            kind: RowKind::Summary,
            duration: plan
                .summary
                .render(&DurationParts::from_hours(group.hours, increment)),
            raw_hours: group.hours,
            source: group.key.source,
            title: group.key.title,
            description: group.key.description,
            previous_export: None,
            start_date: group.key.start_date,
            start_time: String::new(),
            end_time: String::new(),
            task: group.tasks,
        }));
    }

    let sort_columns = settings.resolved_sort_columns();
    rows.sort_by(|a, b| {
        sort_columns
            .iter()
            .map(|&column| a.cell(column).cmp(b.cell(column)))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    tracing::debug!(rows = rows.len(), "built export rows");
    Ok(rows)
}

/// Marks the intervals [`build_rows`] selected as exported.
///
/// Run only after the export has been written. Every selected interval ends
/// up exported whether or not `export_all` was set, so this marks them all
/// and returns how many were flipped.
pub fn commit_export(timers: &mut [Timer]) -> usize {
    timers
        .iter_mut()
        .map(|timer| timer.intervals.mark_exported())
        .sum()
}
