//! Transaction metadata: solid flag and bookkeeping, persisted separately
//! from the transaction payload itself.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::SystemTime;

use tangle_ternary::Hash;
use thiserror::Error;

use crate::marshal::{Marshal, Modified};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnmarshalFailed {
    #[error("metadata payload too short: {0} bytes, expected {1}")]
    TooShort(usize, usize),

    #[error("metadata hash is not a valid tryte string")]
    InvalidHash,
}

const HASH_BYTE_LEN: usize = tangle_ternary::HASH_TRITS / 3;
const PAYLOAD_LEN: usize = HASH_BYTE_LEN + 1 + 8;

struct Solidity {
    solid: bool,
    arrival_time: u64,
}

pub struct Metadata {
    tx_hash: Hash,
    solidity: Mutex<Solidity>,
    modified: AtomicBool,
}

impl Metadata {
    pub fn new(tx_hash: Hash) -> Self {
        Self {
            tx_hash,
            solidity: Mutex::new(Solidity {
                solid: false,
                arrival_time: now_unix(),
            }),
            modified: AtomicBool::new(true),
        }
    }

    pub fn tx_hash(&self) -> Hash {
        self.tx_hash
    }

    pub fn is_solid(&self) -> bool {
        self.solidity.lock().expect("metadata lock poisoned").solid
    }

    pub fn arrival_time(&self) -> u64 {
        self.solidity
            .lock()
            .expect("metadata lock poisoned")
            .arrival_time
    }

    /// Monotonic: once set, `solid` never flips back to false (property 5).
    /// Returns whether this call actually changed the flag.
    pub fn mark_solid(&self) -> bool {
        let mut solidity = self.solidity.lock().expect("metadata lock poisoned");
        if solidity.solid {
            return false;
        }
        solidity.solid = true;
        drop(solidity);
        self.modified.store(true, Ordering::Release);
        true
    }

    pub fn marshal(&self) -> Vec<u8> {
        let solidity = self.solidity.lock().expect("metadata lock poisoned");
        let mut out = Vec::with_capacity(PAYLOAD_LEN);
        out.extend_from_slice(self.tx_hash.to_string().as_bytes());
        out.push(solidity.solid as u8);
        out.extend_from_slice(&solidity.arrival_time.to_be_bytes());
        out
    }

    pub fn unmarshal(bytes: &[u8]) -> Result<Self, UnmarshalFailed> {
        if bytes.len() != PAYLOAD_LEN {
            return Err(UnmarshalFailed::TooShort(bytes.len(), PAYLOAD_LEN));
        }

        let hash_str =
            std::str::from_utf8(&bytes[0..HASH_BYTE_LEN]).map_err(|_| UnmarshalFailed::InvalidHash)?;
        let tx_hash: Hash = hash_str.parse().map_err(|_| UnmarshalFailed::InvalidHash)?;
        let solid = bytes[HASH_BYTE_LEN] != 0;
        let arrival_time =
            u64::from_be_bytes(bytes[HASH_BYTE_LEN + 1..PAYLOAD_LEN].try_into().unwrap());

        Ok(Self {
            tx_hash,
            solidity: Mutex::new(Solidity {
                solid,
                arrival_time,
            }),
            modified: AtomicBool::new(false),
        })
    }
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl Marshal for Metadata {
    fn marshal(&self) -> Vec<u8> {
        Metadata::marshal(self)
    }
}

impl Modified for Metadata {
    fn is_modified(&self) -> bool {
        self.modified.load(Ordering::Acquire)
    }

    fn clear_modified(&self) {
        self.modified.store(false, Ordering::Release);
    }
}
