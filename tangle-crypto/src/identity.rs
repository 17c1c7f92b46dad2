//! A node's identity: an Ed25519 keypair plus the stable identifier derived
//! from its public key.

use crate::hash::{digest, Hash};
use crate::key::ed25519::{PublicKey, SecretKey, Signature};
use rand_core::{CryptoRng, RngCore};
use std::fmt;

/// Byte length of a peer [`Identifier`] — matches the 20-byte salt size so
/// identifiers and salts share the same XOR-distance arithmetic.
pub const IDENTIFIER_BYTES: usize = 20;

/// Stable identifier derived from a public key (`Blake2b-160(pubkey)`).
pub type Identifier = Hash<IDENTIFIER_BYTES>;

/// Base58 rendering of an [`Identifier`], used in logs and the peer
/// registry's map key.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StringIdentifier(String);

impl StringIdentifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StringIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for StringIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StringIdentifier").field(&self.0).finish()
    }
}

impl From<Identifier> for StringIdentifier {
    fn from(id: Identifier) -> Self {
        Self(bs58::encode(id.as_ref()).into_string())
    }
}

/// A node's full identity: the keypair used to sign autopeering packets and
/// the identifier/string-identifier computed from the public key.
pub struct Identity {
    secret_key: SecretKey,
    public_key: PublicKey,
    identifier: Identifier,
    string_identifier: StringIdentifier,
}

impl Identity {
    /// Generate a fresh identity.
    pub fn generate<Rng: RngCore + CryptoRng>(rng: Rng) -> Self {
        let secret_key = SecretKey::new(rng);
        Self::from_secret_key(secret_key)
    }

    /// Build an identity from an existing secret key (e.g. loaded from a
    /// config file).
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = secret_key.public_key();
        let identifier: Identifier = digest(public_key.as_ref());
        let string_identifier = StringIdentifier::from(identifier);

        Self {
            secret_key,
            public_key,
            identifier,
            string_identifier,
        }
    }

    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    pub fn identifier(&self) -> Identifier {
        self.identifier
    }

    pub fn string_identifier(&self) -> &StringIdentifier {
        &self.string_identifier
    }

    /// Sign a payload with this identity's secret key.
    pub fn sign(&self, payload: &[u8]) -> Signature {
        self.secret_key.sign(payload)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("identifier", &self.string_identifier)
            .finish_non_exhaustive()
    }
}

/// Derive the [`Identifier`] for a standalone public key, without holding
/// the associated secret key (used to validate a remote peer's claimed
/// identity against its public key).
pub fn identifier_from_public_key(public_key: &PublicKey) -> Identifier {
    digest(public_key.as_ref())
}
