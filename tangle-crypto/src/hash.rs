//! Fixed-size byte digests, used for peer identifiers and the autopeering
//! distance hash (as distinct from the ternary transaction hash in
//! `tangle-ternary`).

use cryptoxide::blake2b::Blake2b;
use cryptoxide::digest::Digest as _;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

/// A `BYTES`-long cryptographic digest.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash<const BYTES: usize>([u8; BYTES]);

impl<const BYTES: usize> Hash<BYTES> {
    pub const fn new(bytes: [u8; BYTES]) -> Self {
        Self(bytes)
    }
}

impl<const BYTES: usize> Deref for Hash<BYTES> {
    type Target = [u8; BYTES];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<const BYTES: usize> AsRef<[u8]> for Hash<BYTES> {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl<const BYTES: usize> From<[u8; BYTES]> for Hash<BYTES> {
    fn from(bytes: [u8; BYTES]) -> Self {
        Self(bytes)
    }
}

impl<const BYTES: usize> fmt::Debug for Hash<BYTES> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple(&format!("Hash<{BYTES}>"))
            .field(&hex::encode(self))
            .finish()
    }
}

impl<const BYTES: usize> fmt::Display for Hash<BYTES> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self))
    }
}

impl<const BYTES: usize> FromStr for Hash<BYTES> {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0; BYTES];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self::new(bytes))
    }
}

/// Hash `input` down to a `BYTES`-long digest using Blake2b.
pub fn digest<const BYTES: usize>(input: &[u8]) -> Hash<BYTES> {
    let mut hasher = Blake2b::new(BYTES);
    hasher.input(input);
    let mut out = [0u8; BYTES];
    hasher.result(&mut out);
    Hash::new(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        let a: Hash<20> = digest(b"hello");
        let b: Hash<20> = digest(b"hello");
        assert_eq!(a, b);
    }

    #[test]
    fn digest_is_sensitive_to_input() {
        let a: Hash<20> = digest(b"hello");
        let b: Hash<20> = digest(b"hellp");
        assert_ne!(a, b);
    }

    #[test]
    fn hex_roundtrip() {
        let a: Hash<20> = digest(b"roundtrip");
        let s = a.to_string();
        let b: Hash<20> = s.parse().unwrap();
        assert_eq!(a, b);
    }
}
