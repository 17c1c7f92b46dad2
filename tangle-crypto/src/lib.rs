//! Node identity, Ed25519 signing and the autopeering distance function.

pub mod distance;
pub mod hash;
pub mod identity;
pub mod key;
pub mod salt;

pub use distance::distance;
pub use identity::{Identifier, Identity, StringIdentifier};
pub use key::ed25519::{PublicKey, SecretKey, Signature};
pub use salt::Salt;
