//! Rust-native building blocks for a gossip tangle node.
//!
//! This crate doesn't implement a node by itself, it re-exports the
//! component crates (ternary codec, crypto, transaction layout, storage,
//! solidifier, autopeering, transport, gossip relay) under one namespace so
//! that `tangle-node` can wire them together without juggling eight separate
//! `extern crate` paths.

#[doc(inline)]
pub use tangle_ternary as ternary;

#[doc(inline)]
pub use tangle_crypto as crypto;

#[doc(inline)]
pub use tangle_tx as tx;

#[doc(inline)]
pub use tangle_store as store;

#[doc(inline)]
pub use tangle_solidifier as solidifier;

#[doc(inline)]
pub use tangle_peering as peering;

#[doc(inline)]
pub use tangle_transport as transport;

#[doc(inline)]
pub use tangle_gossip as gossip;
