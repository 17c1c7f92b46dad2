//! Peer registers: a registry of known peers keyed by identifier, plus the
//! bounded chosen/accepted neighbor sets and the unbounded
//! neighborhood/known-peers registers that sit alongside them.
//!
//! Internal synchronization is a single read-write guard per register:
//! writers exclusive, readers shared.

use std::collections::HashMap;
use std::sync::RwLock;

use tangle_crypto::Identifier;

use crate::peer::{LivePeer, Peer};

/// A registry of known peers keyed by [`Identifier`]. Used directly for
/// `knownPeers`/`neighborhood`, and wrapped by [`NeighborSet`] for the
/// capacity-bounded `chosen`/`accepted` sets.
#[derive(Default)]
pub struct PeerRegistry {
    peers: RwLock<HashMap<Identifier, LivePeer>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new peer, or refresh the `last_seen` timestamp of an
    /// existing one (the `addOrUpdate` operation).
    pub fn add_or_update(&self, peer: Peer) {
        let mut peers = self.peers.write().expect("peer registry lock poisoned");
        match peers.get_mut(&peer.identifier) {
            Some(existing) => {
                existing.peer = peer;
                existing.touch();
            }
            None => {
                peers.insert(peer.identifier, LivePeer::new(peer));
            }
        }
    }

    pub fn remove(&self, identifier: &Identifier) -> bool {
        self.peers
            .write()
            .expect("peer registry lock poisoned")
            .remove(identifier)
            .is_some()
    }

    pub fn contains(&self, identifier: &Identifier) -> bool {
        self.peers
            .read()
            .expect("peer registry lock poisoned")
            .contains_key(identifier)
    }

    pub fn get(&self, identifier: &Identifier) -> Option<Peer> {
        self.peers
            .read()
            .expect("peer registry lock poisoned")
            .get(identifier)
            .map(|live| live.peer)
    }

    pub fn len(&self) -> usize {
        self.peers.read().expect("peer registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A snapshot of every currently known peer, for BFS-style iteration
    /// without holding the lock.
    pub fn snapshot(&self) -> Vec<Peer> {
        self.peers
            .read()
            .expect("peer registry lock poisoned")
            .values()
            .map(|live| live.peer)
            .collect()
    }
}

/// A [`PeerRegistry`] bounded to `capacity` members — the shape shared by
/// `chosenNeighbors` and `acceptedNeighbors`.
pub struct NeighborSet {
    capacity: usize,
    registry: PeerRegistry,
}

impl NeighborSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            registry: PeerRegistry::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    pub fn contains(&self, identifier: &Identifier) -> bool {
        self.registry.contains(identifier)
    }

    pub fn snapshot(&self) -> Vec<Peer> {
        self.registry.snapshot()
    }

    /// Insert `peer` without enforcing capacity — callers decide
    /// admission via the chosen/accepted neighbor policies in
    /// `protocol`, which compare distances before calling this.
    pub fn insert_unchecked(&self, peer: Peer) {
        self.registry.add_or_update(peer);
    }

    pub fn remove(&self, identifier: &Identifier) -> bool {
        self.registry.remove(identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;
    use std::net::{IpAddr, Ipv4Addr};
    use tangle_crypto::Identity;

    fn sample_peer() -> Peer {
        let identity = Identity::generate(OsRng);
        Peer::new(
            identity.public_key(),
            IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            14600,
            14626,
        )
    }

    #[test]
    fn add_or_update_refreshes_existing_entry() {
        let registry = PeerRegistry::new();
        let mut peer = sample_peer();
        registry.add_or_update(peer);
        assert_eq!(registry.len(), 1);

        peer.gossip_port = 9999;
        registry.add_or_update(peer);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&peer.identifier).unwrap().gossip_port, 9999);
    }

    #[test]
    fn remove_is_idempotent() {
        let registry = PeerRegistry::new();
        let peer = sample_peer();
        registry.add_or_update(peer);
        assert!(registry.remove(&peer.identifier));
        assert!(!registry.remove(&peer.identifier));
    }

    #[test]
    fn neighbor_set_reports_fullness() {
        let set = NeighborSet::new(1);
        assert!(!set.is_full());
        set.insert_unchecked(sample_peer());
        assert!(set.is_full());
    }
}
