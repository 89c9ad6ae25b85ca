//! Core logic for yt timers.
//!
//! This crate contains the types and algorithms for:
//! - Interval storage: recording stop events with merge, adjacency and
//!   short-interval policies
//! - Export: rolling intervals up into Full and Summary rows and writing CSV
//! - Persisted document shapes and their schema versions

pub mod csv;
pub mod export;
mod interval;
mod store;
pub mod template;
mod timer;
pub mod version;

pub use export::{
    Column, ExportError, ExportRow, ExportSettings, GroupKey, RowKind, build_rows, commit_export,
};
pub use interval::{Interval, ValidationError};
pub use store::{IntervalError, IntervalStore, MergeSettings, RecordedStop, StopAction};
pub use timer::{DATA_VERSIONS, DataFile, Timer};
pub use version::{SchemaVersion, VersionError, VersionRange};
