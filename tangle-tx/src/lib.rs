//! Fixed-layout ternary transaction record.
//!
//! A [`Transaction`] wraps a `TX_TRITS`-long trit buffer behind a single
//! `RwLock` (the "hasher barrier") and memoises every decoded field plus the
//! hash in its own [`Memo`] slot. Setters take the write half of the lock,
//! re-encode the changed field in place, and invalidate the hash/byte memos;
//! readers only ever take the read half, so concurrent field access never
//! blocks on decoding.

mod balance;
mod error;
mod layout;
mod memo;

pub use balance::{AddressBalance, Entry as BalanceEntry, UnmarshalFailed as MalformedBalance};
pub use error::MalformedTransaction;
pub use layout::TX_TRITS;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use memo::Memo;
use tangle_ternary::integer::{i64_to_trits, trits_to_i64, trits_to_u64, u64_to_trits};
use tangle_ternary::{
    packed_byte_len, trits_to_bytes, trits_to_trytes, trytes_to_trits, Hash, Trit,
};

/// A single transaction record: a signature/message fragment, a target
/// address and value, bundle-linking trunk/branch hashes, head/tail
/// markers, a type tag and a proof-of-work nonce.
pub struct Transaction {
    buffer: RwLock<Box<[Trit]>>,
    modified: AtomicBool,

    hash: Memo<Hash>,
    bytes: Memo<Vec<u8>>,
}

impl Transaction {
    /// Build a transaction from an exact `TX_TRITS`-length trit buffer.
    pub fn from_trits(trits: Vec<Trit>) -> Result<Self, MalformedTransaction> {
        if trits.len() != TX_TRITS {
            return Err(MalformedTransaction::WrongTritLength { got: trits.len() });
        }
        Ok(Self {
            buffer: RwLock::new(trits.into_boxed_slice()),
            modified: AtomicBool::new(false),
            hash: Memo::default(),
            bytes: Memo::default(),
        })
    }

    /// Build a transaction from its packed-byte wire form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MalformedTransaction> {
        let expected = packed_byte_len(TX_TRITS);
        if bytes.len() != expected {
            return Err(MalformedTransaction::WrongByteLength {
                got: bytes.len(),
                expected,
            });
        }
        let trits = tangle_ternary::bytes_to_trits(bytes, TX_TRITS)
            .map_err(MalformedTransaction::InvalidField)?;
        Self::from_trits(trits)
    }

    /// A defensive copy of the raw trit buffer.
    pub fn get_trits(&self) -> Vec<Trit> {
        self.buffer.read().expect("tx buffer lock poisoned").to_vec()
    }

    /// The packed-byte wire form, memoised until the next mutation.
    pub fn get_bytes(&self) -> Vec<u8> {
        self.bytes
            .get_or_init(|| trits_to_bytes(&self.buffer.read().expect("tx buffer lock poisoned")))
    }

    /// The Curl-P-81 hash of the transaction, memoised until the next
    /// mutation. This is the "hasher barrier": it takes only a read lock, so
    /// concurrent hashing never contends with other readers.
    pub fn hash(&self) -> Hash {
        self.hash
            .get_or_init(|| tangle_ternary::curl::hash(&self.buffer.read().expect("tx buffer lock poisoned")))
    }

    /// Proof-of-work weight: the number of trailing zero trits in the hash.
    pub fn weight_magnitude(&self) -> usize {
        self.hash().trailing_zero_trits()
    }

    /// Whether any setter has changed this transaction's buffer since
    /// construction (or since the last [`Transaction::clear_modified`]).
    pub fn is_modified(&self) -> bool {
        self.modified.load(Ordering::Acquire)
    }

    pub fn clear_modified(&self) {
        self.modified.store(false, Ordering::Release);
    }

    fn invalidate(&self) {
        self.hash.invalidate();
        self.bytes.invalidate();
        self.modified.store(true, Ordering::Release);
    }

    /// Overwrite `field range` with `trits` and invalidate the hash/byte
    /// memos, unless the field already holds those exact trits.
    fn set_field(&self, range: std::ops::Range<usize>, trits: &[Trit]) -> bool {
        let mut buffer = self.buffer.write().expect("tx buffer lock poisoned");
        if &buffer[range.clone()] == trits {
            return false;
        }
        buffer[range].copy_from_slice(trits);
        drop(buffer);
        self.invalidate();
        true
    }

    pub fn signature_message_fragment(&self) -> String {
        let buffer = self.buffer.read().expect("tx buffer lock poisoned");
        trits_to_trytes(&buffer[layout::SIGNATURE_MESSAGE_FRAGMENT_OFFSET..layout::SIGNATURE_MESSAGE_FRAGMENT_END])
            .expect("fragment field is always tryte-aligned")
    }

    pub fn set_signature_message_fragment(
        &self,
        trytes: &str,
    ) -> Result<bool, MalformedTransaction> {
        let trits = trytes_to_trits(trytes)?;
        if trits.len() != layout::SIGNATURE_MESSAGE_FRAGMENT_SIZE {
            return Err(MalformedTransaction::WrongTritLength { got: trits.len() });
        }
        Ok(self.set_field(
            layout::SIGNATURE_MESSAGE_FRAGMENT_OFFSET..layout::SIGNATURE_MESSAGE_FRAGMENT_END,
            &trits,
        ))
    }

    pub fn address(&self) -> Hash {
        let buffer = self.buffer.read().expect("tx buffer lock poisoned");
        let mut array = [0 as Trit; tangle_ternary::HASH_TRITS];
        array.copy_from_slice(&buffer[layout::ADDRESS_OFFSET..layout::ADDRESS_END]);
        Hash::new(array)
    }

    pub fn set_address(&self, address: Hash) -> bool {
        self.set_field(layout::ADDRESS_OFFSET..layout::ADDRESS_END, &*address)
    }

    pub fn value(&self) -> i64 {
        let buffer = self.buffer.read().expect("tx buffer lock poisoned");
        trits_to_i64(&buffer[layout::VALUE_OFFSET..layout::VALUE_END])
    }

    pub fn set_value(&self, value: i64) -> bool {
        let trits = i64_to_trits(value, layout::VALUE_SIZE);
        self.set_field(layout::VALUE_OFFSET..layout::VALUE_END, &trits)
    }

    pub fn timestamp(&self) -> u64 {
        let buffer = self.buffer.read().expect("tx buffer lock poisoned");
        trits_to_u64(&buffer[layout::TIMESTAMP_OFFSET..layout::TIMESTAMP_END])
    }

    pub fn set_timestamp(&self, timestamp: u64) -> bool {
        let trits = u64_to_trits(timestamp, layout::TIMESTAMP_SIZE);
        self.set_field(layout::TIMESTAMP_OFFSET..layout::TIMESTAMP_END, &trits)
    }

    pub fn shard_marker(&self) -> String {
        let buffer = self.buffer.read().expect("tx buffer lock poisoned");
        trits_to_trytes(&buffer[layout::SHARD_MARKER_OFFSET..layout::SHARD_MARKER_END])
            .expect("shard marker field is always tryte-aligned")
    }

    pub fn set_shard_marker(&self, trytes: &str) -> Result<bool, MalformedTransaction> {
        let trits = trytes_to_trits(trytes)?;
        if trits.len() != layout::SHARD_MARKER_SIZE {
            return Err(MalformedTransaction::WrongTritLength { got: trits.len() });
        }
        Ok(self.set_field(layout::SHARD_MARKER_OFFSET..layout::SHARD_MARKER_END, &trits))
    }

    pub fn trunk_hash(&self) -> Hash {
        let buffer = self.buffer.read().expect("tx buffer lock poisoned");
        let mut array = [0 as Trit; tangle_ternary::HASH_TRITS];
        array.copy_from_slice(&buffer[layout::TRUNK_HASH_OFFSET..layout::TRUNK_HASH_END]);
        Hash::new(array)
    }

    pub fn set_trunk_hash(&self, hash: Hash) -> bool {
        self.set_field(layout::TRUNK_HASH_OFFSET..layout::TRUNK_HASH_END, &*hash)
    }

    pub fn branch_hash(&self) -> Hash {
        let buffer = self.buffer.read().expect("tx buffer lock poisoned");
        let mut array = [0 as Trit; tangle_ternary::HASH_TRITS];
        array.copy_from_slice(&buffer[layout::BRANCH_HASH_OFFSET..layout::BRANCH_HASH_END]);
        Hash::new(array)
    }

    pub fn set_branch_hash(&self, hash: Hash) -> bool {
        self.set_field(layout::BRANCH_HASH_OFFSET..layout::BRANCH_HASH_END, &*hash)
    }

    pub fn is_head(&self) -> bool {
        let buffer = self.buffer.read().expect("tx buffer lock poisoned");
        buffer[layout::HEAD_OFFSET] == 1
    }

    pub fn set_head(&self, head: bool) -> bool {
        self.set_field(
            layout::HEAD_OFFSET..layout::HEAD_END,
            &[if head { 1 } else { 0 }],
        )
    }

    pub fn is_tail(&self) -> bool {
        let buffer = self.buffer.read().expect("tx buffer lock poisoned");
        buffer[layout::TAIL_OFFSET] == 1
    }

    pub fn set_tail(&self, tail: bool) -> bool {
        self.set_field(
            layout::TAIL_OFFSET..layout::TAIL_END,
            &[if tail { 1 } else { 0 }],
        )
    }

    pub fn transaction_type(&self) -> i64 {
        let buffer = self.buffer.read().expect("tx buffer lock poisoned");
        trits_to_i64(&buffer[layout::TRANSACTION_TYPE_OFFSET..layout::TRANSACTION_TYPE_END])
    }

    pub fn set_transaction_type(&self, value: i64) -> bool {
        let trits = i64_to_trits(value, layout::TRANSACTION_TYPE_SIZE);
        self.set_field(
            layout::TRANSACTION_TYPE_OFFSET..layout::TRANSACTION_TYPE_END,
            &trits,
        )
    }

    pub fn nonce(&self) -> String {
        let buffer = self.buffer.read().expect("tx buffer lock poisoned");
        trits_to_trytes(&buffer[layout::NONCE_OFFSET..layout::NONCE_END])
            .expect("nonce field is always tryte-aligned")
    }

    pub fn set_nonce(&self, trytes: &str) -> Result<bool, MalformedTransaction> {
        let trits = trytes_to_trits(trytes)?;
        if trits.len() != layout::NONCE_SIZE {
            return Err(MalformedTransaction::WrongTritLength { got: trits.len() });
        }
        Ok(self.set_field(layout::NONCE_OFFSET..layout::NONCE_END, &trits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zero_tx() -> Transaction {
        Transaction::from_trits(vec![0; TX_TRITS]).unwrap()
    }

    #[test]
    fn from_trits_rejects_wrong_length() {
        assert!(Transaction::from_trits(vec![0; TX_TRITS - 1]).is_err());
    }

    #[test]
    fn from_bytes_rejects_wrong_length() {
        assert!(Transaction::from_bytes(&[0u8; 4]).is_err());
    }

    #[test]
    fn byte_roundtrip_preserves_hash() {
        let tx = zero_tx();
        tx.set_value(-1337);
        let bytes = tx.get_bytes();
        let restored = Transaction::from_bytes(&bytes).unwrap();
        assert_eq!(tx.hash(), restored.hash());
        assert_eq!(tx.value(), restored.value());
    }

    #[test]
    fn setter_is_noop_when_value_unchanged() {
        let tx = zero_tx();
        assert!(!tx.set_value(0));
        assert!(!tx.is_modified());
    }

    #[test]
    fn setter_invalidates_hash_and_marks_modified() {
        let tx = zero_tx();
        let before = tx.hash();
        assert!(tx.set_value(42));
        assert!(tx.is_modified());
        assert_ne!(before, tx.hash());
    }

    #[test]
    fn head_and_tail_roundtrip() {
        let tx = zero_tx();
        assert!(!tx.is_head());
        assert!(tx.set_head(true));
        assert!(tx.is_head());
        assert!(tx.set_tail(true));
        assert!(tx.is_tail());
    }

    #[test]
    fn address_and_trunk_branch_roundtrip() {
        let tx = zero_tx();
        let mut trits = [1 as Trit; tangle_ternary::HASH_TRITS];
        trits[0] = -1;
        let address = Hash::new(trits);
        assert!(tx.set_address(address));
        assert_eq!(tx.address(), address);
        assert!(tx.set_trunk_hash(address));
        assert_eq!(tx.trunk_hash(), address);
    }

    #[test]
    fn timestamp_roundtrip() {
        let tx = zero_tx();
        assert!(tx.set_timestamp(1_700_000_000));
        assert_eq!(tx.timestamp(), 1_700_000_000);
    }
}
