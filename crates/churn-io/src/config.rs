// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Persisted [`ShuffleConfig`] values.
//!
//! [`ConfigStore`] is the byte-level port (one blob per key); [`ConfigRepo`]
//! layers the JSON encoding of `ShuffleConfig` on top. Explicit config files
//! named on the command line go through [`read_config_file`] instead.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use churn_core::ShuffleConfig;
use thiserror::Error;
use tracing::debug;

/// Key the shuffle settings are stored under.
pub const SHUFFLE_KEY: &str = "shuffle";

/// Failure to locate, read or decode a config.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform has no per-user config directory.
    #[error("[CHURN_CONFIG_NO_DIR] no config directory available for churn")]
    NoConfigDir,
    /// Nothing stored under the key.
    #[error("[CHURN_CONFIG_MISSING] no config stored under `{key}`")]
    Missing {
        /// Requested key.
        key: String,
    },
    /// Reading or writing the backing file failed.
    #[error("[CHURN_CONFIG_IO] {}: {source}", .path.display())]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// The blob is not a valid `ShuffleConfig`.
    #[error("[CHURN_CONFIG_MALFORMED] {origin}: {source}")]
    Malformed {
        /// Key or path the blob came from.
        origin: String,
        /// Decoder error.
        source: serde_json::Error,
    },
}

/// Byte-level storage for config blobs.
pub trait ConfigStore {
    /// Bytes stored under `key`, or [`ConfigError::Missing`].
    fn read(&self, key: &str) -> Result<Vec<u8>, ConfigError>;
    /// Replaces whatever is stored under `key`.
    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), ConfigError>;
}

impl<T: ConfigStore + ?Sized> ConfigStore for &T {
    fn read(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        (**self).read(key)
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), ConfigError> {
        (**self).write(key, bytes)
    }
}

/// Loads and saves the shuffle settings through a [`ConfigStore`].
#[derive(Debug)]
pub struct ConfigRepo<S> {
    store: S,
    key: String,
}

impl<S: ConfigStore> ConfigRepo<S> {
    /// Repo over `store` using [`SHUFFLE_KEY`].
    pub fn new(store: S) -> Self {
        Self::with_key(store, SHUFFLE_KEY)
    }

    /// Repo over `store` using a custom key.
    pub fn with_key(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Stored settings; `Ok(None)` when nothing (or an empty blob) is stored.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Malformed`] for undecodable blobs; store failures other
    /// than [`ConfigError::Missing`] pass through.
    pub fn load(&self) -> Result<Option<ShuffleConfig>, ConfigError> {
        let bytes = match self.store.read(&self.key) {
            Ok(bytes) => bytes,
            Err(ConfigError::Missing { .. }) => return Ok(None),
            Err(err) => return Err(err),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        let cfg = decode(&bytes, &self.key)?;
        debug!(key = %self.key, "loaded stored config");
        Ok(Some(cfg))
    }

    /// Stored settings, or [`ShuffleConfig::default`] when nothing is stored.
    ///
    /// # Errors
    ///
    /// Same as [`ConfigRepo::load`].
    pub fn load_or_default(&self) -> Result<ShuffleConfig, ConfigError> {
        Ok(self.load()?.unwrap_or_default())
    }

    /// Writes `cfg` as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Store write failures.
    pub fn save(&self, cfg: &ShuffleConfig) -> Result<(), ConfigError> {
        let bytes = serde_json::to_vec_pretty(cfg).map_err(|source| ConfigError::Malformed {
            origin: self.key.clone(),
            source,
        })?;
        self.store.write(&self.key, &bytes)
    }
}

/// Parses a JSON config file. Missing fields take their defaults.
///
/// # Errors
///
/// [`ConfigError::Io`] if the file cannot be read, [`ConfigError::Malformed`]
/// if it is not a valid config.
pub fn read_config_file(path: &Path) -> Result<ShuffleConfig, ConfigError> {
    let bytes = fs::read(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode(&bytes, &path.display().to_string())
}

fn decode(bytes: &[u8], origin: &str) -> Result<ShuffleConfig, ConfigError> {
    serde_json::from_slice(bytes).map_err(|source| ConfigError::Malformed {
        origin: origin.to_owned(),
        source,
    })
}
