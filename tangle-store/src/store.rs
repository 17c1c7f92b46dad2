//! Tangle store: three parallel sub-stores — transactions, approvers,
//! metadata — each a (cache, KV namespace) pair with identical
//! `Store/Get/Contains` shape.

use std::sync::Arc;

use tangle_ternary::Hash;
use tangle_tx::Transaction;
use thiserror::Error;
use tracing::debug;

use crate::approvers::{self, Approvers};
use crate::cache::WriteBehindCache;
use crate::kv::{KvStore, StoreError};
use crate::metadata::{self, Metadata};

pub const DEFAULT_CACHE_SIZE: usize = 50_000;

const TRANSACTIONS_NAMESPACE: &str = "transactions";
const APPROVERS_NAMESPACE: &str = "approvers";
const METADATA_NAMESPACE: &str = "metadata";

#[derive(Debug, Error)]
pub enum TangleError {
    #[error("database error: {0}")]
    DatabaseError(#[from] StoreError),

    #[error("unmarshal failed: {0}")]
    UnmarshalFailed(String),
}

/// A (write-behind cache, KV namespace) pair offering the store's
/// `Store/Get/Contains` shape for one of the three record kinds.
struct SubStore<V> {
    cache: WriteBehindCache<V>,
    kv: Arc<dyn KvStore>,
    namespace: &'static str,
}

impl<V> SubStore<V>
where
    V: crate::marshal::Marshal + crate::marshal::Modified + Send + Sync + 'static,
{
    fn new(namespace: &'static str, capacity: usize, kv: Arc<dyn KvStore>) -> Self {
        Self {
            cache: WriteBehindCache::new(namespace, capacity, kv.clone()),
            kv,
            namespace,
        }
    }

    fn store(&self, hash: Hash, value: Arc<V>) {
        self.cache.set(hash, value);
    }

    fn contains(&self, hash: &Hash) -> Result<bool, TangleError> {
        if self.cache.contains(hash) {
            return Ok(true);
        }
        Ok(self.kv.contains(self.namespace, hash.to_string().as_bytes())?)
    }

    fn get_raw(&self, hash: &Hash) -> Result<Option<Vec<u8>>, TangleError> {
        Ok(self.kv.get(self.namespace, hash.to_string().as_bytes())?)
    }
}

pub struct TangleStore {
    transactions: SubStore<Transaction>,
    approvers: SubStore<Approvers>,
    metadata: SubStore<Metadata>,
}

impl TangleStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self::with_capacity(kv, DEFAULT_CACHE_SIZE)
    }

    pub fn with_capacity(kv: Arc<dyn KvStore>, capacity: usize) -> Self {
        Self {
            transactions: SubStore::new(TRANSACTIONS_NAMESPACE, capacity, kv.clone()),
            approvers: SubStore::new(APPROVERS_NAMESPACE, capacity, kv.clone()),
            metadata: SubStore::new(METADATA_NAMESPACE, capacity, kv),
        }
    }

    pub fn store_transaction(&self, hash: Hash, tx: Arc<Transaction>) {
        debug!(%hash, "storing transaction");
        self.transactions.store(hash, tx);
    }

    pub fn contains_transaction(&self, hash: &Hash) -> Result<bool, TangleError> {
        self.transactions.contains(hash)
    }

    pub fn get_transaction(&self, hash: &Hash) -> Result<Option<Arc<Transaction>>, TangleError> {
        if let Some(hit) = self.transactions.cache.get(hash) {
            return Ok(Some(hit));
        }
        match self.transactions.get_raw(hash)? {
            Some(bytes) => {
                let tx = Transaction::from_bytes(&bytes)
                    .map_err(|err| TangleError::UnmarshalFailed(err.to_string()))?;
                let tx = Arc::new(tx);
                self.transactions.cache.set(*hash, tx.clone());
                Ok(Some(tx))
            }
            None => Ok(None),
        }
    }

    pub fn store_approvers(&self, approvers: Arc<Approvers>) {
        let hash = approvers.self_hash();
        self.approvers.store(hash, approvers);
    }

    /// Fetch the approvers record for `hash`, creating an empty one if
    /// absent (the approvers index is read-or-create by construction: a
    /// child arriving before its parent still needs somewhere to register).
    pub fn get_or_create_approvers(&self, hash: Hash) -> Result<Arc<Approvers>, TangleError> {
        if let Some(existing) = self.approvers.cache.get(&hash) {
            return Ok(existing);
        }
        let loaded = self
            .approvers
            .cache
            .compute_if_absent(hash, || match self.approvers.get_raw(&hash) {
                Ok(Some(bytes)) => approvers::Approvers::unmarshal(&bytes).ok().map(Arc::new),
                _ => None,
            });

        match loaded {
            Some(approvers) => Ok(approvers),
            None => {
                let fresh = Arc::new(Approvers::new(hash));
                self.approvers.store(hash, fresh.clone());
                Ok(fresh)
            }
        }
    }

    pub fn contains_approvers(&self, hash: &Hash) -> Result<bool, TangleError> {
        self.approvers.contains(hash)
    }

    pub fn store_metadata(&self, metadata: Arc<Metadata>) {
        let hash = metadata.tx_hash();
        self.metadata.store(hash, metadata);
    }

    pub fn get_or_create_metadata(&self, hash: Hash) -> Result<Arc<Metadata>, TangleError> {
        if let Some(existing) = self.metadata.cache.get(&hash) {
            return Ok(existing);
        }
        let loaded = self
            .metadata
            .cache
            .compute_if_absent(hash, || match self.metadata.get_raw(&hash) {
                Ok(Some(bytes)) => metadata::Metadata::unmarshal(&bytes).ok().map(Arc::new),
                _ => None,
            });

        match loaded {
            Some(metadata) => Ok(metadata),
            None => {
                let fresh = Arc::new(Metadata::new(hash));
                self.metadata.store(hash, fresh.clone());
                Ok(fresh)
            }
        }
    }

    pub fn contains_metadata(&self, hash: &Hash) -> Result<bool, TangleError> {
        self.metadata.contains(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemKvStore;

    fn zero_tx() -> Transaction {
        Transaction::from_trits(vec![0; tangle_tx::TX_TRITS]).unwrap()
    }

    #[test]
    fn store_then_get_roundtrips_through_cache() {
        let store = TangleStore::with_capacity(MemKvStore::new(), 16);
        let tx = Arc::new(zero_tx());
        let hash = tx.hash();

        store.store_transaction(hash, tx.clone());
        assert!(store.contains_transaction(&hash).unwrap());

        let fetched = store.get_transaction(&hash).unwrap().unwrap();
        assert_eq!(fetched.hash(), hash);
    }

    #[test]
    fn get_or_create_approvers_returns_fresh_record_on_miss() {
        let store = TangleStore::with_capacity(MemKvStore::new(), 16);
        let hash = Hash::zero();
        let approvers = store.get_or_create_approvers(hash).unwrap();
        assert_eq!(approvers.self_hash(), hash);
        assert!(approvers.get_hashes().is_empty());
    }
}
