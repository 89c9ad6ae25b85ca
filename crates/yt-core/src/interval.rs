//! A single recorded time interval.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for intervals.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// A timestamp was NaN or infinite.
    #[error("{field} must be a finite timestamp, got {value}")]
    NonFinite { field: &'static str, value: f64 },

    /// The interval would have a negative duration.
    #[error("interval ends before it starts (start {start}, end {end})")]
    Reversed { start: f64, end: f64 },
}

/// On-disk shape of an interval: `[start, end, exported, note]`.
type IntervalTuple = (f64, f64, bool, String);

/// A closed time range in Unix seconds, with an exported flag and a free-text note.
///
/// `start <= end` always holds; the only way to build an interval is through
/// [`Interval::new`] (or deserialization, which goes through the same check).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "IntervalTuple", into = "IntervalTuple")]
pub struct Interval {
    pub(crate) start: f64,
    pub(crate) end: f64,
    /// Whether the interval has been included in a committed export.
    pub exported: bool,
    /// Task description shown in the export's task column.
    pub note: String,
}

impl Interval {
    /// Creates an unexported interval with an empty note.
    pub fn new(start: f64, end: f64) -> Result<Self, ValidationError> {
        check_finite("start", start)?;
        check_finite("end", end)?;
        if end < start {
            return Err(ValidationError::Reversed { start, end });
        }
        Ok(Self {
            start,
            end,
            exported: false,
            note: String::new(),
        })
    }

    #[must_use]
    pub fn with_exported(mut self, exported: bool) -> Self {
        self.exported = exported;
        self
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    pub const fn start(&self) -> f64 {
        self.start
    }

    pub const fn end(&self) -> f64 {
        self.end
    }

    /// Length of the interval in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.end - self.start
    }
}

fn check_finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::NonFinite { field, value })
    }
}

impl TryFrom<IntervalTuple> for Interval {
    type Error = ValidationError;

    fn try_from((start, end, exported, note): IntervalTuple) -> Result<Self, Self::Error> {
        Ok(Self::new(start, end)?.with_exported(exported).with_note(note))
    }
}

impl From<Interval> for IntervalTuple {
    fn from(interval: Interval) -> Self {
        (interval.start, interval.end, interval.exported, interval.note)
    }
}
