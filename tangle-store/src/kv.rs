//! The `Get/Set/Contains/Delete` KV contract the tangle store persists
//! through, plus a production `rocksdb` backend and an in-memory test
//! double.
//!
//! Grounded on `pallas_rolldb::kvtable::KVTable`: namespaces mirror that
//! trait's column families, and `RocksKvStore` opens one CF per namespace
//! up front the same way `pallas-rolldb` does for its chain tables.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("kv backend io error: {0}")]
    Io(String),

    #[error("unmarshal failed: {0}")]
    UnmarshalFailed(String),

    #[error("unknown namespace: {0}")]
    UnknownNamespace(String),
}

pub trait KvStore: Send + Sync + 'static {
    fn get(&self, namespace: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;
    fn put(&self, namespace: &str, key: &[u8], value: &[u8]) -> Result<(), StoreError>;
    fn contains(&self, namespace: &str, key: &[u8]) -> Result<bool, StoreError> {
        Ok(self.get(namespace, key)?.is_some())
    }
    fn delete(&self, namespace: &str, key: &[u8]) -> Result<(), StoreError>;
}

/// Production backend: one `rocksdb` column family per namespace, opened
/// eagerly so `cf_handle` lookups never race a missing CF.
pub struct RocksKvStore {
    db: rocksdb::DB,
}

impl RocksKvStore {
    pub fn open(path: impl AsRef<std::path::Path>, namespaces: &[&str]) -> Result<Self, StoreError> {
        let mut options = rocksdb::Options::default();
        options.create_if_missing(true);
        options.create_missing_column_families(true);

        let cfs: Vec<rocksdb::ColumnFamilyDescriptor> = namespaces
            .iter()
            .map(|name| rocksdb::ColumnFamilyDescriptor::new(*name, rocksdb::Options::default()))
            .collect();

        let db = rocksdb::DB::open_cf_descriptors(&options, path, cfs)
            .map_err(|err| StoreError::Io(err.to_string()))?;

        Ok(Self { db })
    }

    fn cf(&self, namespace: &str) -> Result<rocksdb::ColumnFamilyRef<'_>, StoreError> {
        self.db
            .cf_handle(namespace)
            .ok_or_else(|| StoreError::UnknownNamespace(namespace.to_string()))
    }
}

impl KvStore for RocksKvStore {
    fn get(&self, namespace: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let cf = self.cf(namespace)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|err| StoreError::Io(err.to_string()))
    }

    fn put(&self, namespace: &str, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        let cf = self.cf(namespace)?;
        self.db
            .put_cf(&cf, key, value)
            .map_err(|err| StoreError::Io(err.to_string()))
    }

    fn delete(&self, namespace: &str, key: &[u8]) -> Result<(), StoreError> {
        let cf = self.cf(namespace)?;
        self.db
            .delete_cf(&cf, key)
            .map_err(|err| StoreError::Io(err.to_string()))
    }
}

/// In-memory test double — one `HashMap` per namespace behind a single
/// `Mutex`, the same role `pallas-rolldb`'s tests give a `tempfile`-backed
/// `rocksdb::DB` rather than a mock.
#[derive(Default)]
pub struct MemKvStore {
    namespaces: Mutex<HashMap<String, HashMap<Vec<u8>, Vec<u8>>>>,
}

impl MemKvStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl KvStore for MemKvStore {
    fn get(&self, namespace: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let guard = self.namespaces.lock().expect("kv lock poisoned");
        Ok(guard.get(namespace).and_then(|ns| ns.get(key)).cloned())
    }

    fn put(&self, namespace: &str, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        let mut guard = self.namespaces.lock().expect("kv lock poisoned");
        guard
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, namespace: &str, key: &[u8]) -> Result<(), StoreError> {
        let mut guard = self.namespaces.lock().expect("kv lock poisoned");
        if let Some(ns) = guard.get_mut(namespace) {
            ns.remove(key);
        }
        Ok(())
    }
}
