//! In-process backend.

use std::sync::Mutex;

use async_trait::async_trait;
use dca_core::TargetMap;

use super::{StoreError, TargetStore};

/// Holds the map in memory. `None` behaves like a store with no map yet.
#[derive(Debug, Default)]
pub struct MemoryStore {
    map: Mutex<Option<TargetMap>>,
}

impl MemoryStore {
    pub fn new(map: TargetMap) -> Self {
        Self {
            map: Mutex::new(Some(map)),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Current contents.
    pub fn snapshot(&self) -> Option<TargetMap> {
        self.map.lock().ok().and_then(|m| m.clone())
    }
}

#[async_trait]
impl TargetStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self) -> Result<TargetMap, StoreError> {
        self.snapshot().ok_or(StoreError::NotFound)
    }

    async fn put(&self, map: &TargetMap) -> Result<(), StoreError> {
        let mut guard = self
            .map
            .lock()
            .map_err(|_| StoreError::Transient("memory store lock poisoned".into()))?;
        *guard = Some(map.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_until_written() {
        let store = MemoryStore::empty();
        assert!(matches!(store.get().await, Err(StoreError::NotFound)));
        let map = TargetMap::parse(r#"{"BTC_THB":"07:00"}"#).unwrap();
        store.create(&map).await.unwrap();
        assert_eq!(store.get().await.unwrap(), map);
    }
}
