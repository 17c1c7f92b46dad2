//! Ed25519 asymmetric keys used to sign and verify autopeering packets.

use cryptoxide::ed25519::{self, PRIVATE_KEY_LENGTH, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};
use rand_core::{CryptoRng, RngCore};
use std::{fmt, str::FromStr};
use thiserror::Error;
use zeroize::Zeroize;

/// Ed25519 secret key. Scrubbed from memory on drop.
pub struct SecretKey([u8; Self::SIZE]);

/// Ed25519 public key, safe to share and embed in peer descriptors.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; Self::SIZE]);

/// Ed25519 signature over an arbitrary byte payload.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; Self::SIZE]);

#[derive(Debug, Error)]
pub enum TryFromPublicKeyError {
    #[error("invalid public key size, expecting {}", PublicKey::SIZE)]
    InvalidSize,
}

#[derive(Debug, Error)]
pub enum TryFromSignatureError {
    #[error("invalid signature size, expecting {}", Signature::SIZE)]
    InvalidSize,
}

macro_rules! impl_size_zero {
    ($Type:ty, $Size:expr) => {
        impl $Type {
            pub const SIZE: usize = $Size;

            fn zero() -> Self {
                Self([0; Self::SIZE])
            }
        }
    };
}

impl_size_zero!(SecretKey, PRIVATE_KEY_LENGTH);
impl_size_zero!(PublicKey, PUBLIC_KEY_LENGTH);
impl_size_zero!(Signature, SIGNATURE_LENGTH);

impl SecretKey {
    /// Generate a new secret key with the given random number generator.
    pub fn new<Rng>(mut rng: Rng) -> Self
    where
        Rng: RngCore + CryptoRng,
    {
        let mut s = Self::zero();
        rng.fill_bytes(&mut s.0);
        s
    }

    /// Derive the public key associated with this secret key.
    pub fn public_key(&self) -> PublicKey {
        let (mut sk, pk) = ed25519::keypair(&self.0);
        sk.zeroize();
        PublicKey(pk)
    }

    /// Sign an arbitrary byte payload.
    pub fn sign<T: AsRef<[u8]>>(&self, msg: T) -> Signature {
        let (mut sk, _) = ed25519::keypair(&self.0);
        let signature = ed25519::signature(msg.as_ref(), &sk);
        sk.zeroize();
        Signature(signature)
    }
}

impl PublicKey {
    /// Verify `signature` was produced over `message` by the matching
    /// secret key.
    pub fn verify<T: AsRef<[u8]>>(&self, message: T, signature: &Signature) -> bool {
        ed25519::verify(message.as_ref(), &self.0, &signature.0)
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.0.zeroize()
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey").finish_non_exhaustive()
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PublicKey").field(&hex::encode(self.0)).finish()
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Signature").field(&hex::encode(self.0)).finish()
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; Self::SIZE]> for PublicKey {
    fn from(bytes: [u8; Self::SIZE]) -> Self {
        Self(bytes)
    }
}

impl From<[u8; Self::SIZE]> for Signature {
    fn from(bytes: [u8; Self::SIZE]) -> Self {
        Self(bytes)
    }
}

impl From<[u8; Self::SIZE]> for SecretKey {
    fn from(bytes: [u8; Self::SIZE]) -> Self {
        Self(bytes)
    }
}

impl<'a> TryFrom<&'a [u8]> for PublicKey {
    type Error = TryFromPublicKeyError;

    fn try_from(value: &'a [u8]) -> Result<Self, Self::Error> {
        if value.len() != Self::SIZE {
            Err(Self::Error::InvalidSize)
        } else {
            let mut s = Self::zero();
            s.0.copy_from_slice(value);
            Ok(s)
        }
    }
}

impl<'a> TryFrom<&'a [u8]> for Signature {
    type Error = TryFromSignatureError;

    fn try_from(value: &'a [u8]) -> Result<Self, Self::Error> {
        if value.len() != Self::SIZE {
            Err(Self::Error::InvalidSize)
        } else {
            let mut s = Self::zero();
            s.0.copy_from_slice(value);
            Ok(s)
        }
    }
}

impl FromStr for PublicKey {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut r = Self::zero();
        hex::decode_to_slice(s, &mut r.0)?;
        Ok(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn signing_roundtrips() {
        let sk = SecretKey::new(OsRng);
        let pk = sk.public_key();
        let sig = sk.sign(b"autopeering ping");
        assert!(pk.verify(b"autopeering ping", &sig));
    }

    #[test]
    fn tampered_message_fails() {
        let sk = SecretKey::new(OsRng);
        let pk = sk.public_key();
        let sig = sk.sign(b"autopeering ping");
        assert!(!pk.verify(b"autopeering pong", &sig));
    }

    #[test]
    fn public_key_try_from_rejects_wrong_size() {
        let bytes = [0u8; 10];
        assert!(matches!(
            PublicKey::try_from(&bytes[..]),
            Err(TryFromPublicKeyError::InvalidSize)
        ));
    }
}
