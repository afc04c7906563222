//! Checkpoint persistence
//!
//! Stores one serializable checkpoint per file as versioned JSON with an MD5
//! checksum over the data, written atomically through a temp file.
//! A missing file means "no checkpoint yet".

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// State store error types
#[derive(Debug, Error)]
pub enum StateError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Corruption detected
    #[error("Corruption detected: {0}")]
    Corruption(String),

    /// Version mismatch
    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Expected version
        expected: u32,
        /// Found version
        found: u32,
    },
}

/// Result type for state store operations
pub type Result<T> = std::result::Result<T, StateError>;

/// On-disk envelope around the stored value
#[derive(Debug, Clone, Serialize, Deserialize)]
struct VersionedState<T> {
    version: u32,
    checksum: String,
    data: T,
}

fn checksum_of<T: Serialize>(data: &T) -> Result<String> {
    let json = serde_json::to_string(data)?;
    Ok(format!("{:x}", md5::compute(json)))
}

/// Store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path to the state file
    pub path: PathBuf,
    /// Current schema version
    pub version: u32,
    /// Write through a temp file + rename
    pub atomic_writes: bool,
}

impl StoreConfig {
    /// Create a configuration for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            version: 1,
            atomic_writes: true,
        }
    }

    /// Set schema version
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Enable or disable atomic writes
    pub fn atomic_writes(mut self, enabled: bool) -> Self {
        self.atomic_writes = enabled;
        self
    }
}

/// File-backed store for one checkpoint value
///
/// # Examples
/// ```no_run
/// use fetch_state::{CheckpointStore, StoreConfig};
///
/// # async fn example() -> fetch_state::Result<()> {
/// let store: CheckpointStore<String> = CheckpointStore::new(StoreConfig::new("checkpoint.json"));
/// let previous = store.load().await?;
/// store.save(&"42-0".to_string()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CheckpointStore<T> {
    config: StoreConfig,
    _phantom: PhantomData<T>,
}

impl<T> CheckpointStore<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Create a store
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            _phantom: PhantomData,
        }
    }

    /// Path of the state file
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Load the stored value, `None` if nothing was saved yet
    pub async fn load(&self) -> Result<Option<T>> {
        let contents = match fs::read_to_string(&self.config.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let versioned: VersionedState<T> = serde_json::from_str(&contents)?;

        let computed = checksum_of(&versioned.data)?;
        if computed != versioned.checksum {
            return Err(StateError::Corruption(format!(
                "Checksum mismatch: expected {}, got {}",
                versioned.checksum, computed
            )));
        }

        if versioned.version != self.config.version {
            return Err(StateError::VersionMismatch {
                expected: self.config.version,
                found: versioned.version,
            });
        }

        Ok(Some(versioned.data))
    }

    /// Persist a value, replacing whatever was stored
    pub async fn save(&self, data: &T) -> Result<()> {
        let versioned = VersionedState {
            version: self.config.version,
            checksum: checksum_of(data)?,
            data,
        };
        let json = serde_json::to_string_pretty(&versioned)?;

        if self.config.atomic_writes {
            self.write_atomic(&json).await?;
        } else {
            fs::write(&self.config.path, json).await?;
        }

        tracing::debug!(path = %self.config.path.display(), "Saved checkpoint");
        Ok(())
    }

    /// Remove the stored value
    pub async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.config.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_atomic(&self, contents: &str) -> Result<()> {
        let temp_path = self.config.path.with_extension("tmp");

        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(contents.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &self.config.path).await?;
        Ok(())
    }
}
