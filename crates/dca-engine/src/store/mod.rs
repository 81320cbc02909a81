//! Target-map storage backends.
//!
//! The whole map is read and written as one JSON document. There is no
//! partial update: callers read, modify in memory, and write the full map
//! back.
//!
//! | Backend                 | Location                                        |
//! |-------------------------|-------------------------------------------------|
//! | [`GithubVariableStore`] | GitHub Actions repository variable              |
//! | [`FileStore`]           | Local JSON file                                 |
//! | [`MemoryStore`]         | In-process (tests, dry runs)                    |

pub mod file;
pub mod github;
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use dca_core::TargetMap;
use dca_core::config::{StoreConfig, StoreKind};
use dca_core::error::DcaError;
use thiserror::Error;

pub use file::FileStore;
pub use github::GithubVariableStore;
pub use memory::MemoryStore;

/// Storage failure, classified for the retry policy.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Worth retrying: timeouts, connection errors, 5xx, 429.
    #[error("transient store error: {0}")]
    Transient(String),

    /// The map does not exist yet.
    #[error("target map not found")]
    NotFound,

    /// The store refused the request; retrying will not help.
    #[error("store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The stored value is not a valid target map.
    #[error("malformed target map: {0}")]
    Malformed(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<DcaError> for StoreError {
    fn from(e: DcaError) -> Self {
        match e {
            DcaError::MalformedTargetMap(message) => Self::Malformed(message),
            other => Self::Malformed(other.to_string()),
        }
    }
}

/// Read/write access to the target map.
#[async_trait]
pub trait TargetStore: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    async fn get(&self) -> Result<TargetMap, StoreError>;

    /// Replace the stored map.
    async fn put(&self, map: &TargetMap) -> Result<(), StoreError>;

    /// Create the map after [`StoreError::NotFound`].
    async fn create(&self, map: &TargetMap) -> Result<(), StoreError> {
        self.put(map).await
    }
}

/// Build the backend selected by `config.kind`.
pub fn create_store(config: &StoreConfig) -> Result<Box<dyn TargetStore>> {
    match config.kind {
        StoreKind::Github => Ok(Box::new(GithubVariableStore::from_config(config)?)),
        StoreKind::File => {
            let path = config
                .file_path
                .clone()
                .ok_or_else(|| anyhow::anyhow!("store.kind = file requires store.file_path"))?;
            Ok(Box::new(FileStore::new(path)))
        }
    }
}
