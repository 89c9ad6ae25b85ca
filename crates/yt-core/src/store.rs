//! Interval storage for a single timer.
//!
//! [`IntervalStore`] owns one timer's interval list and decides, on every stop
//! event, whether the session extends the last interval, merges into it, or
//! becomes a new interval.
//!
//! # Stop cascade
//!
//! 1. Empty list: append.
//! 2. Last interval starts exactly at the session start: refresh its end
//!    (the running-timer tick).
//! 3. Otherwise, against the last interval `(old_start, old_end)`:
//!    - overlap: session starts strictly inside it, extend to the session end;
//!    - adjacency: session starts after it within the configured gap, bridge;
//!    - containment: session starts before it and reaches into it, widen;
//!    - else append.
//! 4. On a final stop, a session no longer than the short threshold is dropped.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::interval::{Interval, ValidationError};

/// Errors from interval store operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IntervalError {
    /// The caller passed timestamps that cannot form an interval.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// No interval exists at the given position.
    #[error("interval {index} does not exist ({len} intervals)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Policy for merging a stopped session into the stored intervals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeSettings {
    /// Merge a session that starts inside the last interval.
    pub merge_overlapping: bool,
    /// Merge a session that starts shortly after the last interval ends.
    pub merge_adjacent: bool,
    /// Drop sessions shorter than `max_short_secs` when the timer is paused.
    pub delete_short: bool,
    /// Largest gap in seconds that still counts as adjacent.
    /// Default: 120 (pause, type a note, resume).
    pub max_adjacency_gap_secs: f64,
    /// Longest session in seconds treated as an accidental start.
    /// Default: 2.
    pub max_short_secs: f64,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            merge_overlapping: true,
            merge_adjacent: true,
            delete_short: true,
            max_adjacency_gap_secs: 120.0,
            max_short_secs: 2.0,
        }
    }
}

/// Which branch of the stop cascade handled a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopAction {
    Appended,
    Refreshed,
    MergedOverlap,
    MergedAdjacent,
    MergedContained,
}

/// Outcome of [`IntervalStore::record_stop`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordedStop {
    pub action: StopAction,
    /// Start of the interval now holding the session. Callers adopt this as
    /// their current start so later ticks take the refresh path.
    pub effective_start: f64,
    /// The session was dropped as too short.
    pub removed_short: bool,
}

/// The interval list of one timer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntervalStore {
    intervals: Vec<Interval>,
}

impl IntervalStore {
    pub const fn new() -> Self {
        Self {
            intervals: Vec::new(),
        }
    }

    pub fn from_intervals(intervals: Vec<Interval>) -> Self {
        Self { intervals }
    }

    /// Read-only view of the intervals in stored order.
    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Records a stop (or a tick) of a session started at `current_start`.
    ///
    /// `current_start = None` means the timer is not running and nothing is
    /// stored. `is_final_stop` is true when the timer is being paused and
    /// false on intermediate ticks; only a final stop may delete a short
    /// session.
    ///
    /// The list must already be sorted (see [`Self::sort_intervals`]) when it
    /// may have been edited out of order.
    pub fn record_stop(
        &mut self,
        current_start: Option<f64>,
        end: f64,
        settings: &MergeSettings,
        is_final_stop: bool,
    ) -> Result<Option<RecordedStop>, IntervalError> {
        let Some(start) = current_start else {
            return Ok(None);
        };
        let session = Interval::new(start, end)?;
        let (action, effective_start) = self.store_session(session, settings);

        // Judged on the stored interval, so a merge never drops recorded time.
        let stored_span = self.intervals.last().map_or(0.0, |last| last.end - last.start);
        let removed_short =
            is_final_stop && settings.delete_short && stored_span <= settings.max_short_secs;
        if removed_short {
            self.intervals.pop();
        }

        tracing::debug!(
            ?action,
            start,
            end,
            effective_start,
            removed_short,
            "recorded stop"
        );

        Ok(Some(RecordedStop {
            action,
            effective_start,
            removed_short,
        }))
    }

    #[expect(
        clippy::float_cmp,
        reason = "a tick carries the exact start it was given"
    )]
    fn store_session(&mut self, session: Interval, settings: &MergeSettings) -> (StopAction, f64) {
        let (start, end) = (session.start, session.end);
        let Some(last) = self.intervals.last_mut() else {
            self.intervals.push(session);
            return (StopAction::Appended, start);
        };

        if last.start == start {
            last.end = end;
            return (StopAction::Refreshed, start);
        }

        let (old_start, old_end) = (last.start, last.end);

        if settings.merge_overlapping && old_start < start && start < old_end {
            last.end = end;
            return (StopAction::MergedOverlap, old_start);
        }

        // Overlap needs start < old_end and adjacency start > old_end, so at
        // most one of the two can match.
        if settings.merge_adjacent
            && start > old_end
            && start - old_end <= settings.max_adjacency_gap_secs
        {
            last.end = end;
            return (StopAction::MergedAdjacent, old_start);
        }

        if settings.merge_overlapping && start < old_start && end > old_start {
            last.start = start;
            last.end = end.max(old_end);
            return (StopAction::MergedContained, start);
        }

        self.intervals.push(session);
        (StopAction::Appended, start)
    }

    /// Sums interval lengths in seconds.
    ///
    /// With `as_of`, each interval only counts up to that instant.
    pub fn total_elapsed(&self, as_of: Option<f64>, unexported_only: bool) -> f64 {
        self.intervals
            .iter()
            .filter(|i| !unexported_only || !i.exported)
            .map(|i| {
                let end = as_of.map_or(i.end, |limit| i.end.min(limit));
                (end - i.start).max(0.0)
            })
            .sum()
    }

    /// Stable sort by `(start, end)`.
    pub fn sort_intervals(&mut self) {
        self.intervals
            .sort_by(|a, b| a.start.total_cmp(&b.start).then(a.end.total_cmp(&b.end)));
    }

    /// Replaces every interval, returning the previous list.
    pub fn replace_all(&mut self, intervals: Vec<Interval>) -> Vec<Interval> {
        std::mem::replace(&mut self.intervals, intervals)
    }

    pub fn set_note(&mut self, index: usize, note: impl Into<String>) -> Result<(), IntervalError> {
        let len = self.intervals.len();
        let interval = self
            .intervals
            .get_mut(index)
            .ok_or(IntervalError::IndexOutOfRange { index, len })?;
        interval.note = note.into();
        Ok(())
    }

    /// Removes and returns the exported intervals, keeping the rest in order.
    pub fn take_exported(&mut self) -> Vec<Interval> {
        let (exported, kept) = std::mem::take(&mut self.intervals)
            .into_iter()
            .partition(|i| i.exported);
        self.intervals = kept;
        exported
    }

    /// Removes and returns every interval.
    pub fn take_all(&mut self) -> Vec<Interval> {
        std::mem::take(&mut self.intervals)
    }

    /// Marks every interval exported; returns how many were not already.
    pub(crate) fn mark_exported(&mut self) -> usize {
        let mut flipped = 0;
        for interval in self.intervals.iter_mut().filter(|i| !i.exported) {
            interval.exported = true;
            flipped += 1;
        }
        flipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(store: &IntervalStore) -> Vec<(f64, f64)> {
        store.intervals().iter().map(|i| (i.start(), i.end())).collect()
    }

    fn store_with(pairs: &[(f64, f64)]) -> IntervalStore {
        IntervalStore::from_intervals(
            pairs
                .iter()
                .map(|&(s, e)| Interval::new(s, e).unwrap())
                .collect(),
        )
    }

    fn no_delete() -> MergeSettings {
        MergeSettings {
            delete_short: false,
            ..MergeSettings::default()
        }
    }

    // ========== Stop Cascade Tests ==========

    #[test]
    fn stop_on_empty_store_appends() {
        let mut store = IntervalStore::new();
        let outcome = store
            .record_stop(Some(100.0), 200.0, &no_delete(), true)
            .unwrap()
            .unwrap();
        assert_eq!(outcome.action, StopAction::Appended);
        assert_eq!(bounds(&store), vec![(100.0, 200.0)]);
        assert!(!store.intervals()[0].exported);
        assert!(store.intervals()[0].note.is_empty());
    }

    #[test]
    fn stop_without_start_is_noop() {
        let mut store = store_with(&[(10.0, 20.0)]);
        let outcome = store
            .record_stop(None, 30.0, &MergeSettings::default(), true)
            .unwrap();
        assert!(outcome.is_none());
        assert_eq!(bounds(&store), vec![(10.0, 20.0)]);
    }

    #[test]
    fn zero_length_session_adds_nothing() {
        let mut store = store_with(&[(0.0, 50.0)]);
        let before = store.total_elapsed(None, true);
        store
            .record_stop(Some(500.0), 500.0, &no_delete(), true)
            .unwrap();
        assert!((store.total_elapsed(None, true) - before).abs() < f64::EPSILON);
    }

    #[test]
    fn overlapping_session_extends_last_interval() {
        let mut store = store_with(&[(10.0, 20.0)]);
        let outcome = store
            .record_stop(Some(15.0), 25.0, &no_delete(), true)
            .unwrap()
            .unwrap();
        assert_eq!(outcome.action, StopAction::MergedOverlap);
        assert!((outcome.effective_start - 10.0).abs() < f64::EPSILON);
        assert_eq!(bounds(&store), vec![(10.0, 25.0)]);
    }

    #[test]
    fn overlap_disabled_appends() {
        let settings = MergeSettings {
            merge_overlapping: false,
            ..no_delete()
        };
        let mut store = store_with(&[(10.0, 20.0)]);
        store.record_stop(Some(15.0), 25.0, &settings, true).unwrap();
        assert_eq!(bounds(&store), vec![(10.0, 20.0), (15.0, 25.0)]);
    }

    #[test]
    fn adjacent_session_bridges_gap() {
        let mut store = store_with(&[(10.0, 20.0)]);
        let settings = MergeSettings {
            max_adjacency_gap_secs: 1.0,
            ..no_delete()
        };
        let outcome = store
            .record_stop(Some(21.0), 30.0, &settings, true)
            .unwrap()
            .unwrap();
        assert_eq!(outcome.action, StopAction::MergedAdjacent);
        assert_eq!(bounds(&store), vec![(10.0, 30.0)]);
    }

    #[test]
    fn gap_wider_than_threshold_appends() {
        let mut store = store_with(&[(10.0, 20.0)]);
        let settings = MergeSettings {
            max_adjacency_gap_secs: 0.5,
            ..no_delete()
        };
        store.record_stop(Some(21.0), 30.0, &settings, true).unwrap();
        assert_eq!(bounds(&store), vec![(10.0, 20.0), (21.0, 30.0)]);
    }

    #[test]
    fn session_containing_last_interval_takes_new_bounds() {
        let mut store = store_with(&[(10.0, 20.0)]);
        let outcome = store
            .record_stop(Some(5.0), 25.0, &no_delete(), true)
            .unwrap()
            .unwrap();
        assert_eq!(outcome.action, StopAction::MergedContained);
        assert_eq!(bounds(&store), vec![(5.0, 25.0)]);
    }

    #[test]
    fn session_reaching_into_last_interval_keeps_later_end() {
        let mut store = store_with(&[(10.0, 20.0)]);
        store.record_stop(Some(5.0), 15.0, &no_delete(), true).unwrap();
        assert_eq!(bounds(&store), vec![(5.0, 20.0)]);
    }

    #[test]
    fn session_starting_at_last_end_appends() {
        let mut store = store_with(&[(10.0, 20.0)]);
        let outcome = store
            .record_stop(Some(20.0), 30.0, &no_delete(), true)
            .unwrap()
            .unwrap();
        assert_eq!(outcome.action, StopAction::Appended);
        assert_eq!(bounds(&store), vec![(10.0, 20.0), (20.0, 30.0)]);
    }

    #[test]
    fn session_before_last_interval_appends() {
        let mut store = store_with(&[(10.0, 20.0)]);
        store.record_stop(Some(1.0), 5.0, &no_delete(), true).unwrap();
        assert_eq!(bounds(&store), vec![(10.0, 20.0), (1.0, 5.0)]);
    }

    #[test]
    fn merge_keeps_exported_flag_and_note() {
        let mut store = IntervalStore::from_intervals(vec![
            Interval::new(10.0, 20.0).unwrap().with_note("standup"),
        ]);
        store.record_stop(Some(15.0), 40.0, &no_delete(), true).unwrap();
        assert_eq!(store.intervals()[0].note, "standup");
    }

    #[test]
    fn reversed_session_is_rejected_without_mutation() {
        let mut store = store_with(&[(10.0, 20.0)]);
        let err = store
            .record_stop(Some(50.0), 40.0, &MergeSettings::default(), true)
            .unwrap_err();
        assert!(matches!(
            err,
            IntervalError::Invalid(ValidationError::Reversed { .. })
        ));
        assert_eq!(bounds(&store), vec![(10.0, 20.0)]);
    }

    // ========== Tick Tests ==========

    #[test]
    fn repeated_tick_is_idempotent() {
        let mut store = IntervalStore::new();
        let settings = MergeSettings::default();
        store.record_stop(Some(100.0), 105.0, &settings, false).unwrap();
        assert_eq!(bounds(&store), vec![(100.0, 105.0)]);
        store.record_stop(Some(100.0), 105.0, &settings, false).unwrap();
        assert_eq!(bounds(&store), vec![(100.0, 105.0)]);
    }

    #[test]
    fn ticks_after_merge_refresh_using_effective_start() {
        let mut store = store_with(&[(10.0, 20.0)]);
        let settings = MergeSettings::default();
        let first = store
            .record_stop(Some(60.0), 61.0, &settings, false)
            .unwrap()
            .unwrap();
        assert_eq!(first.action, StopAction::MergedAdjacent);

        let second = store
            .record_stop(Some(first.effective_start), 90.0, &settings, false)
            .unwrap()
            .unwrap();
        assert_eq!(second.action, StopAction::Refreshed);
        assert_eq!(bounds(&store), vec![(10.0, 90.0)]);
    }

    // ========== Short Interval Tests ==========

    #[test]
    fn short_session_deleted_on_final_stop() {
        let mut store = IntervalStore::new();
        let outcome = store
            .record_stop(Some(100.0), 101.0, &MergeSettings::default(), true)
            .unwrap()
            .unwrap();
        assert!(outcome.removed_short);
        assert!(store.is_empty());
    }

    #[test]
    fn short_session_kept_on_tick() {
        let mut store = IntervalStore::new();
        store
            .record_stop(Some(100.0), 101.0, &MergeSettings::default(), false)
            .unwrap();
        assert_eq!(bounds(&store), vec![(100.0, 101.0)]);
    }

    #[test]
    fn short_session_kept_when_deletion_disabled() {
        let mut store = IntervalStore::new();
        store.record_stop(Some(100.0), 101.0, &no_delete(), true).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn brief_resume_does_not_delete_merged_interval() {
        let mut store = store_with(&[(10.0, 20.0)]);
        let outcome = store
            .record_stop(Some(21.0), 22.0, &MergeSettings::default(), true)
            .unwrap()
            .unwrap();
        assert!(!outcome.removed_short);
        assert_eq!(bounds(&store), vec![(10.0, 22.0)]);
    }

    #[test]
    fn brief_session_reaching_into_interval_keeps_it() {
        let mut store = store_with(&[(10.0, 20.0)]);
        let outcome = store
            .record_stop(Some(9.0), 10.5, &MergeSettings::default(), true)
            .unwrap()
            .unwrap();
        assert_eq!(outcome.action, StopAction::MergedContained);
        assert!(!outcome.removed_short);
        assert_eq!(bounds(&store), vec![(9.0, 20.0)]);
    }

    #[test]
    fn brief_containing_session_still_deleted_when_whole_span_short() {
        let mut store = store_with(&[(10.0, 10.5)]);
        let outcome = store
            .record_stop(Some(9.5), 11.0, &MergeSettings::default(), true)
            .unwrap()
            .unwrap();
        assert!(outcome.removed_short);
        assert!(store.is_empty());
    }

    // ========== Query and Edit Tests ==========

    #[test]
    fn total_elapsed_filters_exported() {
        let store = IntervalStore::from_intervals(vec![
            Interval::new(0.0, 60.0).unwrap(),
            Interval::new(100.0, 130.0).unwrap().with_exported(true),
        ]);
        assert!((store.total_elapsed(None, true) - 60.0).abs() < f64::EPSILON);
        assert!((store.total_elapsed(None, false) - 90.0).abs() < f64::EPSILON);
    }

    #[test]
    fn total_elapsed_clips_to_as_of() {
        let store = store_with(&[(0.0, 60.0), (100.0, 200.0), (300.0, 400.0)]);
        assert!((store.total_elapsed(Some(150.0), false) - 110.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sort_orders_by_start_then_end() {
        let mut store = store_with(&[(30.0, 40.0), (10.0, 25.0), (10.0, 20.0)]);
        store.sort_intervals();
        assert_eq!(bounds(&store), vec![(10.0, 20.0), (10.0, 25.0), (30.0, 40.0)]);
    }

    #[test]
    fn sort_is_stable_for_equal_bounds() {
        let mut store = IntervalStore::from_intervals(vec![
            Interval::new(10.0, 20.0).unwrap().with_note("first"),
            Interval::new(0.0, 5.0).unwrap(),
            Interval::new(10.0, 20.0).unwrap().with_note("second"),
        ]);
        store.sort_intervals();
        let notes: Vec<_> = store.intervals().iter().map(|i| i.note.as_str()).collect();
        assert_eq!(notes, vec!["", "first", "second"]);
    }

    #[test]
    fn replace_all_returns_previous() {
        let mut store = store_with(&[(10.0, 20.0)]);
        let old = store.replace_all(vec![Interval::new(1.0, 2.0).unwrap()]);
        assert_eq!(old.len(), 1);
        assert_eq!(bounds(&store), vec![(1.0, 2.0)]);
    }

    #[test]
    fn set_note_out_of_range() {
        let mut store = store_with(&[(10.0, 20.0)]);
        store.set_note(0, "review").unwrap();
        assert_eq!(store.intervals()[0].note, "review");
        assert_eq!(
            store.set_note(3, "x"),
            Err(IntervalError::IndexOutOfRange { index: 3, len: 1 })
        );
    }

    #[test]
    fn take_exported_keeps_unexported_in_order() {
        let mut store = IntervalStore::from_intervals(vec![
            Interval::new(0.0, 1.0).unwrap().with_exported(true),
            Interval::new(2.0, 3.0).unwrap(),
            Interval::new(4.0, 5.0).unwrap().with_exported(true),
            Interval::new(6.0, 7.0).unwrap(),
        ]);
        let taken = store.take_exported();
        assert_eq!(taken.len(), 2);
        assert_eq!(bounds(&store), vec![(2.0, 3.0), (6.0, 7.0)]);
    }

    #[test]
    fn serializes_transparently() {
        let store = store_with(&[(1.0, 2.0)]);
        let json = serde_json::to_string(&store).unwrap();
        assert_eq!(json, r#"[[1.0,2.0,false,""]]"#);
    }
}
