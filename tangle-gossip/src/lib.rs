//! Gossip relay: a thin broadcast-channel hub keyed off the autopeering
//! engine's `AddNeighbor`/`RemoveNeighbor` events and the solidifier's
//! `ReceiveTransaction` event.
//!
//! Grounded on how `pallas_network::facades` composes miniprotocol clients
//! around one shared bearer: this relay doesn't own any connections
//! itself, it just tracks which peers are currently eligible gossip
//! partners and fans transactions out to/in from whichever layer owns the
//! actual sockets (`tangle-transport`, wired up in `tangle-node`).

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use tangle_crypto::Identifier;
use tangle_peering::GossipEvent;
use tangle_tx::Transaction;
use tokio::sync::broadcast;
use tracing::{debug, trace};

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Relays transactions to/from whatever neighbors the autopeering engine
/// currently has accepted or chosen.
pub struct GossipRelay {
    neighbors: RwLock<HashSet<Identifier>>,
    inbound: broadcast::Sender<Arc<Transaction>>,
    outbound: broadcast::Sender<Arc<Transaction>>,
}

impl Default for GossipRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl GossipRelay {
    pub fn new() -> Self {
        let (inbound, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (outbound, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            neighbors: RwLock::new(HashSet::new()),
            inbound,
            outbound,
        }
    }

    pub fn neighbor_count(&self) -> usize {
        self.neighbors.read().expect("neighbor set lock poisoned").len()
    }

    pub fn is_neighbor(&self, id: &Identifier) -> bool {
        self.neighbors
            .read()
            .expect("neighbor set lock poisoned")
            .contains(id)
    }

    /// Fold an autopeering `GossipEvent` into the local neighbor set. The
    /// autopeering engine calls this directly whenever `chosen`/`accepted`
    /// changes.
    pub fn apply_event(&self, event: GossipEvent) {
        match event {
            GossipEvent::AddNeighbor(id) => {
                if self
                    .neighbors
                    .write()
                    .expect("neighbor set lock poisoned")
                    .insert(id)
                {
                    debug!(%id, "gossip neighbor added");
                }
            }
            GossipEvent::RemoveNeighbor(id) => {
                if self
                    .neighbors
                    .write()
                    .expect("neighbor set lock poisoned")
                    .remove(&id)
                {
                    debug!(%id, "gossip neighbor removed");
                }
            }
        }
    }

    /// A transaction arrived from a neighbor connection; feed it to the
    /// tangle (typically the solidifier's `receive`).
    pub fn receive_transaction(&self, tx: Arc<Transaction>) {
        trace!(hash = %tx.hash(), "transaction received from gossip");
        let _ = self.inbound.send(tx);
    }

    pub fn subscribe_inbound(&self) -> broadcast::Receiver<Arc<Transaction>> {
        self.inbound.subscribe()
    }

    /// Forward a transaction that became known locally (the solidifier's
    /// relay event, emitted regardless of solidity) out to every connected
    /// neighbor. A no-op when nobody is listening, which is the common case
    /// between peering cycles.
    pub fn relay(&self, tx: Arc<Transaction>) {
        if self.neighbor_count() == 0 {
            return;
        }
        let _ = self.outbound.send(tx);
    }

    pub fn subscribe_outbound(&self) -> broadcast::Receiver<Arc<Transaction>> {
        self.outbound.subscribe()
    }
}
