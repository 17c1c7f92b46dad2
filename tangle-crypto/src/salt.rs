//! Short-lived random salts mixed into the autopeering distance function.
//! Every node keeps two: a public salt (used to compute distances of
//! candidates relative to itself) and a private salt (used by remote nodes
//! to compute their distance relative to us).

use rand_core::{CryptoRng, RngCore};
use std::time::{Duration, SystemTime};

/// Byte length of a salt, matching [`crate::identity::IDENTIFIER_BYTES`] so
/// the two can be hashed together and XORed against an identifier.
pub const SALT_BYTES: usize = 20;

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Salt {
    pub bytes: [u8; SALT_BYTES],
    pub expires_at: SystemTime,
}

impl Salt {
    /// Generate a new random salt, valid for `lifetime` from now.
    pub fn generate<Rng: RngCore + CryptoRng>(mut rng: Rng, lifetime: Duration) -> Self {
        let mut bytes = [0u8; SALT_BYTES];
        rng.fill_bytes(&mut bytes);

        Self {
            bytes,
            expires_at: SystemTime::now() + lifetime,
        }
    }

    pub fn is_expired(&self) -> bool {
        SystemTime::now() >= self.expires_at
    }

    /// Seconds-since-epoch representation used on the wire.
    pub fn expiration_unix(&self) -> u64 {
        self.expires_at
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    pub fn from_wire(bytes: [u8; SALT_BYTES], expiration_unix: u64) -> Self {
        Self {
            bytes,
            expires_at: SystemTime::UNIX_EPOCH + Duration::from_secs(expiration_unix),
        }
    }
}

impl std::fmt::Debug for Salt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Salt")
            .field("bytes", &hex::encode(self.bytes))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn fresh_salt_is_not_expired() {
        let salt = Salt::generate(OsRng, Duration::from_secs(3600));
        assert!(!salt.is_expired());
    }

    #[test]
    fn zero_lifetime_is_immediately_expired() {
        let salt = Salt::generate(OsRng, Duration::from_secs(0));
        assert!(salt.is_expired());
    }

    #[test]
    fn wire_roundtrip_preserves_expiration_to_the_second() {
        let salt = Salt::generate(OsRng, Duration::from_secs(600));
        let rebuilt = Salt::from_wire(salt.bytes, salt.expiration_unix());
        assert_eq!(salt.expiration_unix(), rebuilt.expiration_unix());
        assert_eq!(salt.bytes, rebuilt.bytes);
    }
}
