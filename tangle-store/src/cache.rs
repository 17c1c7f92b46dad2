//! Bounded, write-behind LRU cache.
//!
//! Mirrors the original's `onEvictApprovers`-style eviction hook: eviction
//! enqueues a background write of the evicted value *iff* it was modified
//! since the last write, and a failed write is treated as a store-invariant
//! violation — fatal, not retried silently.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;
use tangle_ternary::Hash;
use tracing::{error, trace};

use crate::kv::KvStore;
use crate::marshal::{Marshal, Modified};

pub struct WriteBehindCache<V> {
    namespace: &'static str,
    inner: Mutex<LruCache<Hash, Arc<V>>>,
    kv: Arc<dyn KvStore>,
}

impl<V> WriteBehindCache<V>
where
    V: Marshal + Modified + Send + Sync + 'static,
{
    pub fn new(namespace: &'static str, capacity: usize, kv: Arc<dyn KvStore>) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            namespace,
            inner: Mutex::new(LruCache::new(capacity)),
            kv,
        }
    }

    /// Insert at MRU position, evicting and persisting the LRU entry if the
    /// cache was already at capacity.
    pub fn set(&self, key: Hash, value: Arc<V>) {
        let evicted = {
            let mut guard = self.inner.lock().expect("cache lock poisoned");
            guard.push(key, value)
        };

        if let Some((evicted_key, evicted_value)) = evicted {
            if evicted_key != key {
                self.spawn_write_behind(evicted_key, evicted_value);
            }
        }
    }

    /// Promote and return the cached value, or `None` on a miss.
    pub fn get(&self, key: &Hash) -> Option<Arc<V>> {
        let mut guard = self.inner.lock().expect("cache lock poisoned");
        guard.get(key).cloned()
    }

    pub fn contains(&self, key: &Hash) -> bool {
        let guard = self.inner.lock().expect("cache lock poisoned");
        guard.contains(key)
    }

    /// If absent, compute via `f` and insert the result (if any), then
    /// return it. `f` runs with the cache's lock held, so concurrent
    /// callers for the same key observe exactly one invocation — at the
    /// cost of serializing unrelated keys against each other for the
    /// duration of `f`, a coarser guard than the conceptual per-key one.
    pub fn compute_if_absent(
        &self,
        key: Hash,
        f: impl FnOnce() -> Option<Arc<V>>,
    ) -> Option<Arc<V>> {
        let mut guard = self.inner.lock().expect("cache lock poisoned");
        if let Some(hit) = guard.get(&key) {
            return Some(hit.clone());
        }

        let computed = f()?;
        let evicted = guard.push(key, computed.clone());
        drop(guard);

        if let Some((evicted_key, evicted_value)) = evicted {
            if evicted_key != key {
                self.spawn_write_behind(evicted_key, evicted_value);
            }
        }
        Some(computed)
    }

    fn spawn_write_behind(&self, key: Hash, value: Arc<V>) {
        if !value.is_modified() {
            trace!(namespace = self.namespace, %key, "evicted entry unmodified, skipping write-behind");
            return;
        }

        let kv = self.kv.clone();
        let namespace = self.namespace;
        let bytes = value.marshal();
        let key_bytes = key.to_string().into_bytes();

        tokio::spawn(async move {
            match kv.put(namespace, &key_bytes, &bytes) {
                Ok(()) => value.clear_modified(),
                Err(err) => {
                    error!(namespace, %err, "write-behind persist failed");
                    panic!("write-behind persist failed for namespace {namespace}: {err}");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemKvStore;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Dummy {
        bytes: Vec<u8>,
        modified: AtomicBool,
    }

    impl Marshal for Dummy {
        fn marshal(&self) -> Vec<u8> {
            self.bytes.clone()
        }
    }

    impl Modified for Dummy {
        fn is_modified(&self) -> bool {
            self.modified.load(Ordering::Acquire)
        }
        fn clear_modified(&self) {
            self.modified.store(false, Ordering::Release)
        }
    }

    fn hash(byte: u8) -> Hash {
        let encoded = tangle_ternary::integer::i64_to_trits(byte as i64, tangle_ternary::HASH_TRITS);
        let mut trits = [0 as tangle_ternary::Trit; tangle_ternary::HASH_TRITS];
        trits.copy_from_slice(&encoded);
        Hash::new(trits)
    }

    #[test]
    fn never_exceeds_capacity() {
        let kv = MemKvStore::new();
        let cache: WriteBehindCache<Dummy> = WriteBehindCache::new("test", 2, kv);

        for i in 0..5u8 {
            cache.set(
                hash(i),
                Arc::new(Dummy {
                    bytes: vec![i],
                    modified: AtomicBool::new(false),
                }),
            );
        }

        let guard = cache.inner.lock().unwrap();
        assert!(guard.len() <= 2);
    }

    #[test]
    fn get_promotes_and_hits() {
        let kv = MemKvStore::new();
        let cache: WriteBehindCache<Dummy> = WriteBehindCache::new("test", 4, kv);
        let key = hash(1);
        cache.set(
            key,
            Arc::new(Dummy {
                bytes: vec![1],
                modified: AtomicBool::new(false),
            }),
        );
        assert!(cache.get(&key).is_some());
        assert!(cache.contains(&key));
    }
}
