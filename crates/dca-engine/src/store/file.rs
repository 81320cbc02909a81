//! Local JSON file backend.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dca_core::TargetMap;
use tracing::debug;

use super::{StoreError, TargetStore};

/// Target map kept in a local file.
///
/// Writes go to a sibling temp file that is then renamed over the target,
/// so a crash mid-write leaves the previous map intact.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl TargetStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn get(&self) -> Result<TargetMap, StoreError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(StoreError::NotFound),
            Err(e) => return Err(io_error(&self.path, e)),
        };
        Ok(TargetMap::parse(&text)?)
    }

    async fn put(&self, map: &TargetMap) -> Result<(), StoreError> {
        let tmp = self.temp_path();
        debug!("[store] writing {}", self.path.display());
        tokio::fs::write(&tmp, map.to_json()).await.map_err(|e| io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| io_error(&self.path, e))
    }
}

fn io_error(path: &Path, e: std::io::Error) -> StoreError {
    match e.kind() {
        std::io::ErrorKind::PermissionDenied | std::io::ErrorKind::NotFound => StoreError::Rejected {
            status: 0,
            message: format!("{}: {e}", path.display()),
        },
        _ => StoreError::Transient(format!("{}: {e}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("dca-file-store-{tag}-{}.json", std::process::id()))
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let store = FileStore::new(unique_path("missing"));
        assert!(matches!(store.get().await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn write_then_read() {
        let path = unique_path("rw");
        let store = FileStore::new(&path);
        let map = TargetMap::parse(r#"{"BTC_THB":{"TIME":"07:00","LAST_BUY_DATE":"2025-06-15"},"ETH_THB":"21:30"}"#)
            .unwrap();
        store.put(&map).await.unwrap();
        assert_eq!(store.get().await.unwrap(), map);
        assert!(!store.temp_path().exists());
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn malformed_file() {
        let path = unique_path("bad");
        std::fs::write(&path, "{oops").unwrap();
        let store = FileStore::new(&path);
        let err = store.get().await.unwrap_err();
        assert!(matches!(err, StoreError::Malformed(_)));
        assert_eq!(err.to_string().matches("malformed target map").count(), 1);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn temp_path_is_sibling() {
        let store = FileStore::new("/var/lib/dca/targets.json");
        assert_eq!(store.temp_path(), PathBuf::from("/var/lib/dca/targets.json.tmp"));
    }
}
