//! services/api/src/adapters/storage.rs
//!
//! Local-disk implementation of the `StorageService` port.

use async_trait::async_trait;
use bytes::Bytes;
use debaide_core::ports::{PortError, PortResult, StorageService};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// The URL prefix under which stored files are referenced.
pub const PUBLIC_PREFIX: &str = "/storage/audio";

/// Writes uploads beneath a root directory and references them by URL path.
#[derive(Clone)]
pub struct LocalDiskStorage {
    root: PathBuf,
}

impl LocalDiskStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves a routing key to a path below the root, refusing keys that
    /// would escape it.
    fn resolve(&self, routing_key: &str) -> PortResult<PathBuf> {
        let key = Path::new(routing_key);
        let plain = key.components().all(|c| matches!(c, Component::Normal(_)));
        if routing_key.is_empty() || !plain {
            return Err(PortError::Unexpected(format!("Refusing storage key '{}'", routing_key)));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl StorageService for LocalDiskStorage {
    async fn store(&self, bytes: Bytes, routing_key: &str) -> PortResult<String> {
        let path = self.resolve(routing_key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PortError::Unexpected(format!("Failed to create {}: {}", parent.display(), e)))?;
        }
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to write {}: {}", path.display(), e)))?;

        debug!("Stored {} bytes at {}.", bytes.len(), path.display());
        Ok(format!("{}/{}", PUBLIC_PREFIX, routing_key))
    }
}
