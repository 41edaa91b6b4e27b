// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Filesystem-backed `ConfigStore` (platform config dir or an explicit root).

use crate::config::{ConfigError, ConfigStore};
use directories::ProjectDirs;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// One `<key>.json` file per key under a base directory.
#[derive(Debug, Clone)]
pub struct FsConfigStore {
    base: PathBuf,
}

impl FsConfigStore {
    /// Store under the user config directory (e.g. `~/.config/churn`).
    ///
    /// # Errors
    ///
    /// [`ConfigError::NoConfigDir`] when the platform has no home directory;
    /// [`ConfigError::Io`] when the directory cannot be created.
    pub fn new() -> Result<Self, ConfigError> {
        let proj = ProjectDirs::from("dev", "flyingrobots", "churn")
            .ok_or(ConfigError::NoConfigDir)?;
        Self::at(proj.config_dir())
    }

    /// Store under `base`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] when the directory cannot be created.
    pub fn at(base: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let base = base.as_ref().to_path_buf();
        fs::create_dir_all(&base).map_err(|source| ConfigError::Io {
            path: base.clone(),
            source,
        })?;
        Ok(Self { base })
    }

    /// Directory the store writes into.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// File backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.base.join(format!("{key}.json"))
    }
}

impl ConfigStore for FsConfigStore {
    fn read(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        let path = self.path_for(key);
        fs::read(&path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => ConfigError::Missing {
                key: key.to_owned(),
            },
            _ => ConfigError::Io { path, source },
        })
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), ConfigError> {
        let path = self.path_for(key);
        fs::write(&path, bytes).map_err(|source| ConfigError::Io { path, source })
    }
}
