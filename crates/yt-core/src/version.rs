//! Schema versions for persisted documents.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors raised when a persisted document's version cannot be used.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("data is a later version than this program (data: {found}, program: {current})")]
    TooNew {
        found: SchemaVersion,
        current: SchemaVersion,
    },

    #[error("data cannot be converted to this program's version (data: {found}, program: {current})")]
    TooOld {
        found: SchemaVersion,
        current: SchemaVersion,
    },

    #[error("data version is not a list of integers (data: {found})")]
    BadType { found: String },
}

/// A version as a list of integers, ordered lexicographically (`[1, 2] < [1, 10]`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaVersion(Vec<u32>);

impl SchemaVersion {
    pub fn new(parts: impl Into<Vec<u32>>) -> Self {
        Self(parts.into())
    }

    /// Reads a version out of a raw JSON value.
    pub fn from_value(value: &Value) -> Result<Self, VersionError> {
        let bad_type = || VersionError::BadType {
            found: value.to_string(),
        };
        let parts = value.as_array().ok_or_else(bad_type)?;
        parts
            .iter()
            .map(|part| {
                part.as_u64()
                    .and_then(|n| u32::try_from(n).ok())
                    .ok_or_else(bad_type)
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    pub fn parts(&self) -> &[u32] {
        &self.0
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(".");
        f.write_str(&joined)
    }
}

/// The range of versions a document type can be upgraded from.
#[derive(Debug, Clone, Copy)]
pub struct VersionRange {
    pub current: &'static [u32],
    pub oldest_convertible: &'static [u32],
}

impl VersionRange {
    pub fn current(&self) -> SchemaVersion {
        SchemaVersion::new(self.current)
    }

    /// Returns the version `found` upgrades to, or why it cannot.
    ///
    /// No document type has needed a conversion step yet, so every accepted
    /// version maps straight to `current`.
    pub fn upgrade(&self, found: &SchemaVersion) -> Result<SchemaVersion, VersionError> {
        let current = self.current();
        if found.parts() > self.current {
            return Err(VersionError::TooNew {
                found: found.clone(),
                current,
            });
        }
        if found.parts() < self.oldest_convertible {
            return Err(VersionError::TooOld {
                found: found.clone(),
                current,
            });
        }
        Ok(current)
    }
}
