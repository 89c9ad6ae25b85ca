//! Timer records and the document that holds them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::store::IntervalStore;
use crate::version::{SchemaVersion, VersionError, VersionRange};

/// Version range of the timer data document.
pub const DATA_VERSIONS: VersionRange = VersionRange {
    current: &[1, 0, 0],
    oldest_convertible: &[1, 0, 0],
};

/// A named timer and its intervals.
///
/// Serializes to `{"title", "description", "source system", "intervals"}`.
/// Any other fields found on disk are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timer {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// The ticket system the timer's work is reported against.
    #[serde(rename = "source system", default = "default_source")]
    pub source_system: String,
    #[serde(default)]
    pub intervals: IntervalStore,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_title() -> String {
    "TIMER".to_string()
}

fn default_source() -> String {
    "yt".to_string()
}

impl Timer {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        source_system: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            source_system: source_system.into(),
            intervals: IntervalStore::new(),
            extra: Map::new(),
        }
    }
}

/// Top-level data document: `{"version": [1,0,0], "timerdata": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataFile {
    pub version: SchemaVersion,
    #[serde(default)]
    pub timerdata: Vec<Timer>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for DataFile {
    fn default() -> Self {
        Self {
            version: DATA_VERSIONS.current(),
            timerdata: Vec::new(),
            extra: Map::new(),
        }
    }
}

impl DataFile {
    /// Brings a loaded document to the current version.
    pub fn upgrade(mut self) -> Result<Self, VersionError> {
        self.version = DATA_VERSIONS.upgrade(&self.version)?;
        Ok(self)
    }

    pub fn timer(&self, title: &str) -> Option<&Timer> {
        self.timerdata.iter().find(|t| t.title == title)
    }

    pub fn timer_mut(&mut self, title: &str) -> Option<&mut Timer> {
        self.timerdata.iter_mut().find(|t| t.title == title)
    }

    /// Sorts timers by title, keeping the relative order of equal titles.
    pub fn sort_by_title(&mut self) {
        self.timerdata.sort_by(|a, b| a.title.cmp(&b.title));
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn timer_reads_on_disk_shape() {
        let timer: Timer = serde_json::from_value(json!({
            "title": "COE-4840",
            "description": "Verbose pile of junk",
            "source system": "jira",
            "intervals": [[0, 3500, false, "Blah"]],
        }))
        .unwrap();
        assert_eq!(timer.title, "COE-4840");
        assert_eq!(timer.source_system, "jira");
        assert_eq!(timer.intervals.len(), 1);
    }

    #[test]
    fn timer_fills_missing_fields() {
        let timer: Timer = serde_json::from_value(json!({})).unwrap();
        assert_eq!(timer.title, "TIMER");
        assert_eq!(timer.source_system, "yt");
        assert!(timer.intervals.is_empty());
    }

    #[test]
    fn timer_preserves_unknown_fields() {
        let input = json!({
            "version": [1, 0, 0],
            "title": "A",
            "description": "",
            "source system": "trac",
            "intervals": [],
            "color": "teal",
        });
        let timer: Timer = serde_json::from_value(input.clone()).unwrap();
        assert_eq!(serde_json::to_value(&timer).unwrap(), input);
    }

    #[test]
    fn data_file_upgrade_rejects_newer_version() {
        let data: DataFile =
            serde_json::from_value(json!({"version": [9, 0, 0], "timerdata": []})).unwrap();
        assert!(matches!(data.upgrade(), Err(VersionError::TooNew { .. })));
    }

    #[test]
    fn sort_by_title_is_stable() {
        let mut data = DataFile::default();
        for (title, desc) in [("b", "1"), ("a", "1"), ("b", "2")] {
            data.timerdata.push(Timer::new(title, desc, "yt"));
        }
        data.sort_by_title();
        let order: Vec<_> = data
            .timerdata
            .iter()
            .map(|t| format!("{}{}", t.title, t.description))
            .collect();
        assert_eq!(order, vec!["a1", "b1", "b2"]);
    }
}
