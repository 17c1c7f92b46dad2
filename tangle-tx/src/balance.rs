//! Address balance accumulation.
//!
//! An address (address trytes + shard marker) accumulates a list of value
//! entries, each tagged with the "reality" index the entry was received
//! under, and the running balance is their sum. Not part of the
//! fixed-layout transaction record — the accumulator itself, not a single
//! transaction's fields, is what's marshalled here.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnmarshalFailed {
    #[error("address balance payload too short: {0} bytes")]
    TooShort(usize),

    #[error("address field is not valid utf-8")]
    InvalidAddress,
}

/// A single value contribution to an address's balance, tagged with the
/// reality (ledger fork) index it was observed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub value: i64,
    pub index: u32,
}

impl Entry {
    pub fn new(value: i64, index: u32) -> Self {
        Self { value, index }
    }
}

const ADDRESS_LEN_BYTES: usize = 2;
const COUNT_BYTES: usize = 8;
const ENTRY_BYTES: usize = 8 + 4;

/// An address (81 trytes) plus its 12-tryte shard marker, and every value
/// entry accumulated against it.
pub struct AddressBalance {
    address: String,
    entries: Vec<Entry>,
}

impl AddressBalance {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            entries: Vec::new(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Fold one or more entries into the accumulator.
    pub fn add(&mut self, entries: impl IntoIterator<Item = Entry>) {
        self.entries.extend(entries);
    }

    /// The running balance: the sum of every accumulated entry's value.
    pub fn get_balance(&self) -> i64 {
        self.entries.iter().map(|e| e.value).sum()
    }

    pub fn marshal(&self) -> Vec<u8> {
        let address_bytes = self.address.as_bytes();
        let mut out = Vec::with_capacity(
            ADDRESS_LEN_BYTES + address_bytes.len() + COUNT_BYTES + self.entries.len() * ENTRY_BYTES,
        );
        out.extend_from_slice(&(address_bytes.len() as u16).to_be_bytes());
        out.extend_from_slice(address_bytes);
        out.extend_from_slice(&(self.entries.len() as u64).to_be_bytes());
        for entry in &self.entries {
            out.extend_from_slice(&entry.value.to_be_bytes());
            out.extend_from_slice(&entry.index.to_be_bytes());
        }
        out
    }

    pub fn unmarshal(bytes: &[u8]) -> Result<Self, UnmarshalFailed> {
        if bytes.len() < ADDRESS_LEN_BYTES {
            return Err(UnmarshalFailed::TooShort(bytes.len()));
        }
        let address_len = u16::from_be_bytes(bytes[0..ADDRESS_LEN_BYTES].try_into().unwrap()) as usize;
        let mut offset = ADDRESS_LEN_BYTES;

        if bytes.len() < offset + address_len + COUNT_BYTES {
            return Err(UnmarshalFailed::TooShort(bytes.len()));
        }
        let address = std::str::from_utf8(&bytes[offset..offset + address_len])
            .map_err(|_| UnmarshalFailed::InvalidAddress)?
            .to_string();
        offset += address_len;

        let count = u64::from_be_bytes(bytes[offset..offset + COUNT_BYTES].try_into().unwrap()) as usize;
        offset += COUNT_BYTES;

        let expected = offset + count * ENTRY_BYTES;
        if bytes.len() < expected {
            return Err(UnmarshalFailed::TooShort(bytes.len()));
        }

        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let value = i64::from_be_bytes(bytes[offset..offset + 8].try_into().unwrap());
            offset += 8;
            let index = u32::from_be_bytes(bytes[offset..offset + 4].try_into().unwrap());
            offset += 4;
            entries.push(Entry { value, index });
        }

        Ok(Self { address, entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr_with_shard() -> String {
        let address = "A9999999999999999999999999999999999999999999999999999999999999999999999999999999F";
        let shard = "NPHTQORL9XKA";
        format!("{address}{shard}")
    }

    #[test]
    fn accumulates_entries() {
        let mut addr = AddressBalance::new(addr_with_shard());
        addr.add([Entry::new(100, 1), Entry::new(100, 2)]);
        assert_eq!(addr.get_balance(), 200);
    }

    #[test]
    fn marshal_unmarshal_preserves_balance() {
        let mut addr = AddressBalance::new(addr_with_shard());
        addr.add([Entry::new(100, 1), Entry::new(100, 2)]);

        let bytes = addr.marshal();
        let restored = AddressBalance::unmarshal(&bytes).unwrap();

        assert_eq!(restored.get_balance(), addr.get_balance());
        assert_eq!(restored.address(), addr.address());
    }

    #[test]
    fn negative_entries_can_balance_to_zero() {
        let mut addr = AddressBalance::new(addr_with_shard());
        addr.add([Entry::new(100, 1), Entry::new(-100, 2)]);
        assert_eq!(addr.get_balance(), 0);
    }

    #[test]
    fn unmarshal_rejects_short_payloads() {
        assert!(matches!(
            AddressBalance::unmarshal(&[0u8; 1]),
            Err(UnmarshalFailed::TooShort(_))
        ));
    }
}
