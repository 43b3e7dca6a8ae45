//! Persistent source/target channel configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while loading or saving the channel configuration.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The two channel identifiers the bot works with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Channel messages are copied from.
    #[serde(default)]
    pub source_channel: Option<String>,

    /// Channel messages are copied into.
    #[serde(default)]
    pub target_channel: Option<String>,
}

impl ChannelConfig {
    /// Returns the source channel, treating an empty value as unset.
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        non_empty(self.source_channel.as_deref())
    }

    /// Returns the target channel, treating an empty value as unset.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        non_empty(self.target_channel.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// File-backed holder of the [`ChannelConfig`].
///
/// The in-memory value always matches the last successful save.
#[derive(Debug)]
pub struct ChannelStore {
    path: PathBuf,
    config: ChannelConfig,
}

impl ChannelStore {
    /// Loads the configuration from `path`.
    ///
    /// A missing file yields an empty configuration. A file that exists but
    /// cannot be read or parsed is an error.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let config = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).map_err(|source| StoreError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No configuration at {}, starting empty", path.display());
                ChannelConfig::default()
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        Ok(Self { path, config })
    }

    /// Writes the configuration to disk, replacing the file atomically.
    pub fn save(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&self.config)?;
        let tmp = temp_path(&self.path);

        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;

        debug!("Saved channel configuration to {}", self.path.display());
        Ok(())
    }

    /// Sets and persists the source channel.
    pub fn set_source(&mut self, channel: &str) -> Result<(), StoreError> {
        self.update(|c| &mut c.source_channel, channel)
    }

    /// Sets and persists the target channel.
    pub fn set_target(&mut self, channel: &str) -> Result<(), StoreError> {
        self.update(|c| &mut c.target_channel, channel)
    }

    fn update(
        &mut self,
        field: impl Fn(&mut ChannelConfig) -> &mut Option<String>,
        channel: &str,
    ) -> Result<(), StoreError> {
        let previous = field(&mut self.config).replace(channel.to_owned());

        if let Err(e) = self.save() {
            *field(&mut self.config) = previous; // Rollback
            return Err(e);
        }
        Ok(())
    }

    /// Returns the current configuration.
    #[must_use]
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.config.source()
    }

    #[must_use]
    pub fn target(&self) -> Option<&str> {
        self.config.target()
    }

    /// Returns `(source, target)` only when both are set.
    #[must_use]
    pub fn forward_pair(&self) -> Option<(String, String)> {
        Some((self.source()?.to_owned(), self.target()?.to_owned()))
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChannelStore::load(dir.path().join("config.json")).unwrap();
        assert_eq!(store.config(), &ChannelConfig::default());
        assert!(store.forward_pair().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut store = ChannelStore::load(&path).unwrap();
        store.set_source("@news").unwrap();
        store.set_target("-1001234567890").unwrap();

        let reloaded = ChannelStore::load(&path).unwrap();
        assert_eq!(reloaded.config(), store.config());
        assert_eq!(
            reloaded.forward_pair(),
            Some(("@news".to_owned(), "-1001234567890".to_owned()))
        );
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_reads_null_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"source_channel": "abc", "target_channel": null}"#).unwrap();

        let store = ChannelStore::load(&path).unwrap();
        assert_eq!(store.source(), Some("abc"));
        assert_eq!(store.target(), None);
    }

    #[test]
    fn test_empty_string_counts_as_unset() {
        let config = ChannelConfig {
            source_channel: Some(String::new()),
            target_channel: Some("xyz".to_owned()),
        };
        assert_eq!(config.source(), None);
        assert_eq!(config.target(), Some("xyz"));
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            ChannelStore::load(&path),
            Err(StoreError::Parse { .. })
        ));
    }

    #[test]
    fn test_failed_save_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("config.json");

        let mut store = ChannelStore::load(&path).unwrap();
        assert!(store.set_source("abc").is_err());
        assert_eq!(store.source(), None);
    }
}
