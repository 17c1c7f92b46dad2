//! Traits the write-behind cache needs from a cacheable value: a byte
//! encoding to persist, and a dirty flag telling eviction whether that
//! persist is actually necessary.

pub trait Marshal {
    fn marshal(&self) -> Vec<u8>;
}

/// Tracks whether a value has mutated since it was last written through to
/// the KV store. Eviction only persists when `is_modified()` is true, and
/// clears the flag once the write succeeds.
pub trait Modified {
    fn is_modified(&self) -> bool;
    fn clear_modified(&self);
}

impl Marshal for tangle_tx::Transaction {
    fn marshal(&self) -> Vec<u8> {
        self.get_bytes()
    }
}

impl Modified for tangle_tx::Transaction {
    fn is_modified(&self) -> bool {
        tangle_tx::Transaction::is_modified(self)
    }

    fn clear_modified(&self) {
        tangle_tx::Transaction::clear_modified(self)
    }
}
