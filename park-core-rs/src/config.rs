//! Configuration for the parking engine

use std::path::PathBuf;

use crate::error::StorageError;
use crate::storage::{FileStorage, MemoryStorage, Storage, StorageConfig};

/// Complete engine configuration
#[derive(Debug, Clone, Default)]
pub struct ParkingConfig {
    /// File storage settings; `None` keeps everything in memory
    pub storage: Option<StorageConfig>,
}

impl ParkingConfig {
    /// Nothing survives the process
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Journal and snapshots under `dir`
    pub fn persistent(dir: impl Into<PathBuf>) -> Self {
        Self {
            storage: Some(StorageConfig {
                dir: dir.into(),
                ..Default::default()
            }),
        }
    }

    /// Set fsync policy (only meaningful for persistent storage)
    pub fn with_fsync(mut self, fsync: bool) -> Self {
        if let Some(storage) = self.storage.as_mut() {
            storage.fsync_on_write = fsync;
        }
        self
    }

    /// Set the number of journal batches between snapshots
    pub fn with_snapshot_threshold(mut self, batches: usize) -> Self {
        if let Some(storage) = self.storage.as_mut() {
            storage.snapshot_threshold = batches;
        }
        self
    }

    /// Set the journal size that forces a snapshot
    pub fn with_max_wal_size(mut self, bytes: u64) -> Self {
        if let Some(storage) = self.storage.as_mut() {
            storage.max_wal_size = bytes;
        }
        self
    }

    pub fn is_persistent(&self) -> bool {
        self.storage.is_some()
    }

    /// Build the configured storage backend
    pub fn open_storage(&self) -> Result<Box<dyn Storage>, StorageError> {
        Ok(match &self.storage {
            Some(config) => Box::new(FileStorage::new(config.clone())?),
            None => Box::new(MemoryStorage::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ParkingConfig::persistent("/tmp/lot")
            .with_fsync(false)
            .with_snapshot_threshold(10)
            .with_max_wal_size(4096);

        let storage = config.storage.as_ref().unwrap();
        assert_eq!(storage.dir, PathBuf::from("/tmp/lot"));
        assert!(!storage.fsync_on_write);
        assert_eq!(storage.snapshot_threshold, 10);
        assert_eq!(storage.max_wal_size, 4096);
        assert!(config.is_persistent());
    }

    #[test]
    fn test_in_memory_ignores_storage_settings() {
        let config = ParkingConfig::in_memory().with_fsync(false).with_snapshot_threshold(1);
        assert!(!config.is_persistent());
        assert!(config.storage.is_none());
    }
}
