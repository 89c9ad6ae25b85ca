//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use yt_core::{ExportSettings, MergeSettings};

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the timer data, running state and archives.
    pub data_dir: PathBuf,
    /// Where `yt export` writes CSV files. Defaults to the data directory.
    pub export_dir: Option<PathBuf>,
    /// Starting a timer stops every other running timer.
    pub pause_other_timers: bool,
    pub merge: MergeSettings,
    pub export: ExportSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: dirs_data_path().unwrap_or_else(|| PathBuf::from(".")),
            export_dir: None,
            pause_other_timers: true,
            merge: MergeSettings::default(),
            export: ExportSettings::default(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    ///
    /// Later sources win: defaults, `<config dir>/yt/config.toml`, the given
    /// file, then `YT_*` environment variables (`__` separates nested keys,
    /// e.g. `YT_MERGE__DELETE_SHORT=false`).
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("YT_").split("__"));

        figment.extract()
    }

    pub fn export_dir(&self) -> &Path {
        self.export_dir.as_deref().unwrap_or(&self.data_dir)
    }
}

/// Returns the platform-specific config directory for yt.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("yt"))
}

/// Returns the platform-specific data directory for yt.
///
/// On Linux: `~/.local/share/yt`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("yt"))
}
