//! File storage for yt.
//!
//! Everything lives in one data directory:
//!
//! | file | contents |
//! |---|---|
//! | `timerdata.json` | the [`DataFile`]: every timer and its intervals |
//! | `running.json` | start time of each timer with an open session |
//! | `archive-<encoded title>.json` | intervals moved out of a timer by archival |
//! | `.lock` | advisory lock held while a command loads, edits and saves |
//!
//! JSON is written pretty-printed with tab indentation. Writes go to a
//! sibling temporary file which is then renamed over the target, so a failed
//! write leaves the previous contents in place.

use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use thiserror::Error;
use yt_core::{DATA_VERSIONS, DataFile, Interval, SchemaVersion, Timer, VersionError};

/// Storage errors. Every variant names the file involved.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to access {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid JSON in {}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported data in {}", path.display())]
    Version {
        path: PathBuf,
        #[source]
        source: VersionError,
    },
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn json_error(path: &Path) -> impl FnOnce(serde_json::Error) -> StorageError + '_ {
    move |source| StorageError::Json {
        path: path.to_path_buf(),
        source,
    }
}

/// Start times of timers with an open session, keyed by title.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunningTimers {
    starts: BTreeMap<String, f64>,
}

impl RunningTimers {
    pub fn start_of(&self, title: &str) -> Option<f64> {
        self.starts.get(title).copied()
    }

    pub fn is_running(&self, title: &str) -> bool {
        self.starts.contains_key(title)
    }

    pub fn start(&mut self, title: impl Into<String>, at: f64) {
        self.starts.insert(title.into(), at);
    }

    /// Clears a timer's session, returning its start time.
    pub fn stop(&mut self, title: &str) -> Option<f64> {
        self.starts.remove(title)
    }

    /// Titles and start times, ordered by title.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.starts.iter().map(|(title, &start)| (title.as_str(), start))
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }
}

/// Held while a command owns the data directory; released on drop.
#[derive(Debug)]
pub struct DataLock {
    _file: File,
}

/// Handle on a data directory.
#[derive(Debug, Clone)]
pub struct Storage {
    data_dir: PathBuf,
}

impl Storage {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn data_path(&self) -> PathBuf {
        self.data_dir.join("timerdata.json")
    }

    pub fn running_path(&self) -> PathBuf {
        self.data_dir.join("running.json")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.data_dir.join(".lock")
    }

    pub fn archive_path(&self, title: &str) -> PathBuf {
        self.data_dir
            .join(format!("archive-{}.json", sanitize_file_stem(title)))
    }

    /// Blocks until the data directory's exclusive lock is acquired.
    pub fn lock(&self) -> Result<DataLock, StorageError> {
        std::fs::create_dir_all(&self.data_dir).map_err(io_error(&self.data_dir))?;
        let path = self.lock_path();
        let file = File::create(&path).map_err(io_error(&path))?;
        file.lock_exclusive().map_err(io_error(&path))?;
        tracing::debug!(path = %path.display(), "acquired data lock");
        Ok(DataLock { _file: file })
    }

    /// Loads the timer data, or an empty document when none has been saved.
    ///
    /// The `version` field is checked before the rest of the document is
    /// read, so a newer program's data is rejected rather than misread.
    pub fn load_data(&self) -> Result<DataFile, StorageError> {
        let path = self.data_path();
        let Some(value) = read_json::<Value>(&path)? else {
            tracing::debug!(path = %path.display(), "no data file, starting empty");
            return Ok(DataFile::default());
        };
        let version_error = |source| StorageError::Version {
            path: path.clone(),
            source,
        };
        let found = SchemaVersion::from_value(value.get("version").unwrap_or(&Value::Null))
            .map_err(version_error)?;
        DATA_VERSIONS.upgrade(&found).map_err(version_error)?;

        let data: DataFile = serde_json::from_value(value).map_err(json_error(&path))?;
        data.upgrade().map_err(version_error)
    }

    pub fn save_data(&self, data: &DataFile) -> Result<(), StorageError> {
        let path = self.data_path();
        write_json(&path, data)?;
        tracing::info!(path = %path.display(), timers = data.timerdata.len(), "saved timer data");
        Ok(())
    }

    pub fn load_running(&self) -> Result<RunningTimers, StorageError> {
        Ok(read_json(&self.running_path())?.unwrap_or_default())
    }

    pub fn save_running(&self, running: &RunningTimers) -> Result<(), StorageError> {
        write_json(&self.running_path(), running)
    }

    /// Reads a timer's archive, if it has one.
    pub fn load_archive(&self, title: &str) -> Result<Option<Timer>, StorageError> {
        read_json(&self.archive_path(title))
    }

    /// Appends `intervals` to the timer's archive file, creating it if needed.
    ///
    /// The archive's title, description and source are refreshed from
    /// `timer`. Returns the number of intervals appended.
    pub fn append_archive(
        &self,
        timer: &Timer,
        intervals: Vec<Interval>,
    ) -> Result<usize, StorageError> {
        let path = self.archive_path(&timer.title);
        let mut archive = read_json::<Timer>(&path)?
            .unwrap_or_else(|| Timer::new(&timer.title, "", &timer.source_system));
        archive.title.clone_from(&timer.title);
        archive.description.clone_from(&timer.description);
        archive.source_system.clone_from(&timer.source_system);

        let appended = intervals.len();
        let mut all = archive.intervals.take_all();
        all.extend(intervals);
        archive.intervals.replace_all(all);

        write_json(&path, &archive)?;
        tracing::info!(path = %path.display(), appended, "archived intervals");
        Ok(appended)
    }
}

/// Percent-encodes a title into a file stem.
///
/// ASCII alphanumerics, `-`, `_` and `.` pass through; every other byte
/// becomes `%XX`, so distinct titles never share an archive file.
fn sanitize_file_stem(title: &str) -> String {
    use std::fmt::Write as _;

    let mut stem = String::with_capacity(title.len());
    for byte in title.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.') {
            stem.push(char::from(byte));
        } else {
            let _ = write!(stem, "%{byte:02X}");
        }
    }
    stem
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    match std::fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content)
            .map(Some)
            .map_err(json_error(path)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_error(path)(e)),
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"\t"));
    value
        .serialize(&mut serializer)
        .map_err(json_error(path))?;
    buf.push(b'\n');

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &buf).map_err(io_error(&tmp))?;
    std::fs::rename(&tmp, path).map_err(io_error(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use tempfile::TempDir;

    fn storage() -> (TempDir, Storage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().join("yt"));
        (dir, storage)
    }

    fn write_raw(path: &Path, value: &Value) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, value.to_string()).unwrap();
    }

    // ========== Data File Tests ==========

    #[test]
    fn missing_data_file_loads_empty() {
        let (_dir, storage) = storage();
        let data = storage.load_data().unwrap();
        assert!(data.timerdata.is_empty());
        assert_eq!(data.version, DATA_VERSIONS.current());
    }

    #[test]
    fn data_file_round_trips_with_tab_indent() {
        let (_dir, storage) = storage();
        let mut data = DataFile::default();
        let mut timer = Timer::new("COE-1", "Login bug", "jira");
        timer
            .intervals
            .replace_all(vec![Interval::new(0.0, 3500.0).unwrap().with_note("Blah")]);
        data.timerdata.push(timer);

        storage.save_data(&data).unwrap();
        let raw = std::fs::read_to_string(storage.data_path()).unwrap();
        assert!(raw.starts_with("{\n\t\"version\""));
        assert!(!storage.data_dir().join("timerdata.json.tmp").exists());

        assert_eq!(storage.load_data().unwrap(), data);
    }

    #[test]
    fn data_file_preserves_unknown_fields() {
        let (_dir, storage) = storage();
        let input = json!({
            "version": [1, 0, 0],
            "timerdata": [{
                "title": "A",
                "description": "",
                "source system": "yt",
                "intervals": [],
                "color": "teal",
            }],
            "window": {"width": 800},
        });
        write_raw(&storage.data_path(), &input);

        let data = storage.load_data().unwrap();
        storage.save_data(&data).unwrap();
        let saved: Value =
            serde_json::from_str(&std::fs::read_to_string(storage.data_path()).unwrap()).unwrap();
        assert_eq!(saved, input);
    }

    #[test]
    fn newer_data_version_is_rejected() {
        let (_dir, storage) = storage();
        write_raw(
            &storage.data_path(),
            &json!({"version": [2, 0, 0], "timerdata": []}),
        );
        let err = storage.load_data().unwrap_err();
        assert!(matches!(
            err,
            StorageError::Version {
                source: VersionError::TooNew { .. },
                ..
            }
        ));
    }

    #[test]
    fn missing_version_is_rejected() {
        let (_dir, storage) = storage();
        write_raw(&storage.data_path(), &json!({"timerdata": []}));
        assert!(matches!(
            storage.load_data(),
            Err(StorageError::Version {
                source: VersionError::BadType { .. },
                ..
            })
        ));
    }

    #[test]
    fn corrupt_data_file_names_path() {
        let (_dir, storage) = storage();
        std::fs::create_dir_all(storage.data_dir()).unwrap();
        std::fs::write(storage.data_path(), "{not json").unwrap();
        let err = storage.load_data().unwrap_err();
        assert!(matches!(err, StorageError::Json { .. }));
        assert!(err.to_string().contains("timerdata.json"));
    }

    #[test]
    fn invalid_interval_is_rejected() {
        let (_dir, storage) = storage();
        write_raw(
            &storage.data_path(),
            &json!({
                "version": [1, 0, 0],
                "timerdata": [{"title": "A", "intervals": [[20, 10, false, ""]]}],
            }),
        );
        assert!(matches!(
            storage.load_data(),
            Err(StorageError::Json { .. })
        ));
    }

    // ========== Running Timer Tests ==========

    #[test]
    fn running_timers_round_trip() {
        let (_dir, storage) = storage();
        assert!(storage.load_running().unwrap().is_empty());

        let mut running = RunningTimers::default();
        running.start("B", 200.0);
        running.start("A", 100.5);
        storage.save_running(&running).unwrap();

        let loaded = storage.load_running().unwrap();
        assert_eq!(loaded.iter().collect::<Vec<_>>(), vec![("A", 100.5), ("B", 200.0)]);
        assert!(loaded.is_running("A"));
    }

    #[test]
    fn running_stop_returns_start() {
        let mut running = RunningTimers::default();
        running.start("A", 10.0);
        assert_eq!(running.stop("A"), Some(10.0));
        assert_eq!(running.stop("A"), None);
        assert_eq!(running.start_of("A"), None);
    }

    // ========== Archive Tests ==========

    #[test]
    fn archive_appends_to_existing_file() {
        let (_dir, storage) = storage();
        let timer = Timer::new("COE-1", "first", "jira");
        storage
            .append_archive(&timer, vec![Interval::new(0.0, 10.0).unwrap()])
            .unwrap();

        let renamed = Timer::new("COE-1", "second", "jira");
        let appended = storage
            .append_archive(
                &renamed,
                vec![
                    Interval::new(20.0, 30.0).unwrap(),
                    Interval::new(40.0, 50.0).unwrap(),
                ],
            )
            .unwrap();
        assert_eq!(appended, 2);

        let archive = storage.load_archive("COE-1").unwrap().unwrap();
        assert_eq!(archive.description, "second");
        let starts: Vec<_> = archive.intervals.intervals().iter().map(Interval::start).collect();
        assert_eq!(starts, vec![0.0, 20.0, 40.0]);
    }

    #[test]
    fn archive_path_is_sanitized() {
        let storage = Storage::new("/data");
        assert_eq!(
            storage.archive_path("a/b c:d"),
            PathBuf::from("/data/archive-a%2Fb%20c%3Ad.json")
        );
        assert_eq!(
            storage.archive_path("COE-1.v2_x"),
            PathBuf::from("/data/archive-COE-1.v2_x.json")
        );
    }

    #[test]
    fn similar_titles_get_separate_archives() {
        let storage = Storage::new("/data");
        let paths: Vec<_> = ["a/b", "a:b", "a_b", "a%2Fb"]
            .iter()
            .map(|title| storage.archive_path(title))
            .collect();
        for (i, path) in paths.iter().enumerate() {
            assert!(!paths[i + 1..].contains(path), "{} is shared", path.display());
        }
    }

    #[test]
    fn missing_archive_is_none() {
        let (_dir, storage) = storage();
        assert!(storage.load_archive("nope").unwrap().is_none());
    }

    // ========== Lock Tests ==========

    #[test]
    fn lock_creates_data_dir_and_releases_on_drop() {
        let (_dir, storage) = storage();
        let lock = storage.lock().unwrap();
        assert!(storage.lock_path().exists());
        drop(lock);
        let _again = storage.lock().unwrap();
    }
}
