//! Approvers index: for a transaction hash, the set of children that
//! reference it as trunk or branch.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tangle_ternary::Hash;
use thiserror::Error;

use crate::marshal::{Marshal, Modified};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnmarshalFailed {
    #[error("approvers payload too short: {0} bytes")]
    TooShort(usize),

    #[error("approvers self-hash is not a valid tryte string")]
    InvalidSelfHash,

    #[error("approvers child hash is not a valid tryte string")]
    InvalidChildHash,
}

/// Hash encoded as its 81-character tryte string (ASCII bytes), matching
/// the wire length named in the data model (`selfHash (81 bytes)`).
const HASH_BYTE_LEN: usize = tangle_ternary::HASH_TRITS / 3;
const COUNT_BYTE_LEN: usize = 8;
const MIN_PAYLOAD: usize = COUNT_BYTE_LEN + HASH_BYTE_LEN;

pub struct Approvers {
    self_hash: Hash,
    children: Mutex<HashSet<Hash>>,
    modified: AtomicBool,
}

impl Approvers {
    pub fn new(self_hash: Hash) -> Self {
        Self {
            self_hash,
            children: Mutex::new(HashSet::new()),
            modified: AtomicBool::new(false),
        }
    }

    pub fn self_hash(&self) -> Hash {
        self.self_hash
    }

    /// Idempotent: adding an already-present child leaves the set and the
    /// `modified` flag untouched.
    pub fn add(&self, child: Hash) {
        let mut children = self.children.lock().expect("approvers lock poisoned");
        if children.insert(child) {
            self.modified.store(true, Ordering::Release);
        }
    }

    /// Idempotent: removing an absent child is a no-op.
    pub fn remove(&self, child: &Hash) {
        let mut children = self.children.lock().expect("approvers lock poisoned");
        if children.remove(child) {
            self.modified.store(true, Ordering::Release);
        }
    }

    /// A snapshot of the current child set.
    pub fn get_hashes(&self) -> Vec<Hash> {
        self.children
            .lock()
            .expect("approvers lock poisoned")
            .iter()
            .copied()
            .collect()
    }

    fn encode_hash(hash: &Hash, out: &mut Vec<u8>) {
        out.extend_from_slice(hash.to_string().as_bytes());
    }

    fn decode_hash(bytes: &[u8]) -> Result<Hash, UnmarshalFailed> {
        let trytes = std::str::from_utf8(bytes).map_err(|_| UnmarshalFailed::InvalidChildHash)?;
        trytes.parse().map_err(|_| UnmarshalFailed::InvalidChildHash)
    }

    pub fn marshal(&self) -> Vec<u8> {
        let children = self.children.lock().expect("approvers lock poisoned");
        let mut out = Vec::with_capacity(MIN_PAYLOAD + children.len() * HASH_BYTE_LEN);
        out.extend_from_slice(&(children.len() as u64).to_be_bytes());
        Self::encode_hash(&self.self_hash, &mut out);
        for child in children.iter() {
            Self::encode_hash(child, &mut out);
        }
        out
    }

    pub fn unmarshal(bytes: &[u8]) -> Result<Self, UnmarshalFailed> {
        if bytes.len() < MIN_PAYLOAD {
            return Err(UnmarshalFailed::TooShort(bytes.len()));
        }

        let count = u64::from_be_bytes(bytes[0..COUNT_BYTE_LEN].try_into().unwrap()) as usize;
        let expected = MIN_PAYLOAD + count * HASH_BYTE_LEN;
        if bytes.len() < expected {
            return Err(UnmarshalFailed::TooShort(bytes.len()));
        }

        let self_hash_bytes = &bytes[COUNT_BYTE_LEN..COUNT_BYTE_LEN + HASH_BYTE_LEN];
        let self_hash =
            Self::decode_hash(self_hash_bytes).map_err(|_| UnmarshalFailed::InvalidSelfHash)?;

        let approvers = Self::new(self_hash);
        let mut offset = COUNT_BYTE_LEN + HASH_BYTE_LEN;
        for _ in 0..count {
            let child = Self::decode_hash(&bytes[offset..offset + HASH_BYTE_LEN])?;
            approvers.add(child);
            offset += HASH_BYTE_LEN;
        }
        approvers.modified.store(false, Ordering::Release);
        Ok(approvers)
    }
}

impl Marshal for Approvers {
    fn marshal(&self) -> Vec<u8> {
        Approvers::marshal(self)
    }
}

impl Modified for Approvers {
    fn is_modified(&self) -> bool {
        self.modified.load(Ordering::Acquire)
    }

    fn clear_modified(&self) {
        self.modified.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(seed: i64) -> Hash {
        let trits = tangle_ternary::integer::i64_to_trits(seed, tangle_ternary::HASH_TRITS);
        let mut array = [0 as tangle_ternary::Trit; tangle_ternary::HASH_TRITS];
        array.copy_from_slice(&trits);
        Hash::new(array)
    }

    #[test]
    fn add_and_remove_are_idempotent() {
        let approvers = Approvers::new(hash(1));
        let child = hash(2);

        approvers.add(child);
        approvers.add(child);
        assert_eq!(approvers.get_hashes(), vec![child]);

        approvers.remove(&child);
        approvers.remove(&child);
        assert!(approvers.get_hashes().is_empty());
    }

    #[test]
    fn marshal_unmarshal_roundtrip_is_set_semantic() {
        let approvers = Approvers::new(hash(10));
        approvers.add(hash(20));

        let bytes = approvers.marshal();
        let restored = Approvers::unmarshal(&bytes).unwrap();

        assert_eq!(restored.self_hash(), hash(10));
        assert_eq!(restored.get_hashes(), vec![hash(20)]);
        assert!(!restored.is_modified());
    }

    #[test]
    fn unmarshal_rejects_short_payloads() {
        assert!(matches!(
            Approvers::unmarshal(&[0u8; 4]),
            Err(UnmarshalFailed::TooShort(_))
        ));
    }

    #[test]
    fn unmarshal_rejects_truncated_child_list() {
        let approvers = Approvers::new(hash(1));
        approvers.add(hash(2));
        let mut bytes = approvers.marshal();
        bytes.truncate(bytes.len() - 1);
        assert!(matches!(
            Approvers::unmarshal(&bytes),
            Err(UnmarshalFailed::TooShort(_))
        ));
    }
}
