//! Event-driven DAG walker: marks a transaction solid once both parents,
//! recursively, resolve back to the genesis, then propagates the same
//! check to its known approvers.
//!
//! State machine per transaction: `NEW --receive--> STORED
//! --parents-solid--> SOLID`, with the `STORED, not yet SOLID` branch
//! waiting for a missing parent's later arrival to retrigger it through the
//! approver index — see [`Solidifier::receive`].

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use tangle_ternary::Hash;
use tangle_tx::Transaction;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use tangle_store::{TangleError, TangleStore};

#[derive(Debug, Error)]
pub enum SolidifierError {
    #[error(transparent)]
    Store(#[from] TangleError),
}

const EVENT_CHANNEL_CAPACITY: usize = 1024;

pub struct Solidifier {
    store: Arc<TangleStore>,
    genesis: Hash,
    min_weight: usize,
    solid_tx: broadcast::Sender<Hash>,
    invalid_tx: broadcast::Sender<Hash>,
    relay_tx: broadcast::Sender<Arc<Transaction>>,
}

impl Solidifier {
    pub fn new(store: Arc<TangleStore>, genesis: Hash, min_weight: usize) -> Self {
        let (solid_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (invalid_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (relay_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            genesis,
            min_weight,
            solid_tx,
            invalid_tx,
            relay_tx,
        }
    }

    /// Subscribes to `TransactionSolid(hash)`.
    pub fn subscribe_solid(&self) -> broadcast::Receiver<Hash> {
        self.solid_tx.subscribe()
    }

    /// Subscribes to `InvalidTransaction(hash)`.
    pub fn subscribe_invalid(&self) -> broadcast::Receiver<Hash> {
        self.invalid_tx.subscribe()
    }

    /// Subscribes to `ReceiveTransaction` forwarded downstream to gossip,
    /// regardless of solidity.
    pub fn subscribe_relay(&self) -> broadcast::Receiver<Arc<Transaction>> {
        self.relay_tx.subscribe()
    }

    /// Runs the receive procedure for one incoming transaction: dedup,
    /// weight check, store, register with both parents' approvers, attempt
    /// solidification, then relay downstream. Re-delivery of an
    /// already-stored transaction is an idempotent no-op.
    pub fn receive(&self, tx: Arc<Transaction>) -> Result<(), SolidifierError> {
        let hash = tx.hash();

        if self.store.contains_transaction(&hash)? {
            trace!(%hash, "duplicate transaction, dropping");
            return Ok(());
        }

        if tx.weight_magnitude() < self.min_weight {
            warn!(%hash, weight = tx.weight_magnitude(), min_weight = self.min_weight, "transaction below minimum weight");
            let _ = self.invalid_tx.send(hash);
            return Ok(());
        }

        self.store.store_transaction(hash, tx.clone());
        self.store.get_or_create_metadata(hash)?;

        for parent in [tx.trunk_hash(), tx.branch_hash()] {
            let approvers = self.store.get_or_create_approvers(parent)?;
            approvers.add(hash);
            self.store.store_approvers(approvers);
        }

        self.attempt_solidify(hash)?;

        let _ = self.relay_tx.send(tx);
        Ok(())
    }

    /// Bounded BFS over the approver graph rooted at `start`, processing
    /// each node at most once. Stops expanding a branch as soon as a node
    /// fails to newly solidify.
    fn attempt_solidify(&self, start: Hash) -> Result<(), SolidifierError> {
        let mut queue = VecDeque::from([start]);
        let mut visited = HashSet::new();

        while let Some(hash) = queue.pop_front() {
            if !visited.insert(hash) {
                continue;
            }

            if self.try_mark_solid(hash)? {
                debug!(%hash, "transaction solid");
                let _ = self.solid_tx.send(hash);

                let approvers = self.store.get_or_create_approvers(hash)?;
                queue.extend(approvers.get_hashes());
            }
        }

        Ok(())
    }

    /// Returns `true` iff this call is the one that flipped `hash`'s
    /// metadata to solid (monotonic — property 5).
    fn try_mark_solid(&self, hash: Hash) -> Result<bool, SolidifierError> {
        let metadata = self.store.get_or_create_metadata(hash)?;
        if metadata.is_solid() {
            return Ok(false);
        }

        if hash == self.genesis {
            return Ok(metadata.mark_solid());
        }

        let tx = match self.store.get_transaction(&hash)? {
            Some(tx) => tx,
            None => return Ok(false),
        };

        let trunk_solid = self.store.get_or_create_metadata(tx.trunk_hash())?.is_solid();
        let branch_solid = self
            .store
            .get_or_create_metadata(tx.branch_hash())?
            .is_solid();

        if trunk_solid && branch_solid {
            Ok(metadata.mark_solid())
        } else {
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tangle_store::kv::MemKvStore;
    use tangle_tx::TX_TRITS;

    fn tx_with_parents(trunk: Hash, branch: Hash) -> Arc<Transaction> {
        let tx = Transaction::from_trits(vec![0; TX_TRITS]).unwrap();
        tx.set_trunk_hash(trunk);
        tx.set_branch_hash(branch);
        Arc::new(tx)
    }

    fn solidifier() -> (Solidifier, Hash) {
        let genesis = Hash::zero();
        let store = Arc::new(TangleStore::with_capacity(MemKvStore::new(), 64));
        (Solidifier::new(store, genesis, 0), genesis)
    }

    #[test]
    fn child_of_genesis_solidifies_immediately() {
        let (solidifier, genesis) = solidifier();
        let mut solid_events = solidifier.subscribe_solid();

        let child = tx_with_parents(genesis, genesis);
        let child_hash = child.hash();
        solidifier.receive(child).unwrap();

        assert!(solidifier
            .store
            .get_or_create_metadata(child_hash)
            .unwrap()
            .is_solid());
        assert_eq!(solid_events.try_recv().unwrap(), child_hash);
    }

    #[test]
    fn out_of_order_arrival_solidifies_on_parent_arrival() {
        let (solidifier, genesis) = solidifier();

        let parent = tx_with_parents(genesis, genesis);
        let parent_hash = parent.hash();

        let child = tx_with_parents(parent_hash, genesis);
        let child_hash = child.hash();

        // Child arrives before its parent: it is stored but not solid.
        solidifier.receive(child).unwrap();
        assert!(!solidifier
            .store
            .get_or_create_metadata(child_hash)
            .unwrap()
            .is_solid());

        // Parent arrives later and triggers the child's solidification via
        // the approver index.
        let mut solid_events = solidifier.subscribe_solid();
        solidifier.receive(parent).unwrap();

        let mut seen = HashSet::new();
        while let Ok(hash) = solid_events.try_recv() {
            seen.insert(hash);
        }
        assert!(seen.contains(&parent_hash));
        assert!(seen.contains(&child_hash));
        assert!(solidifier
            .store
            .get_or_create_metadata(child_hash)
            .unwrap()
            .is_solid());
    }

    #[test]
    fn redelivery_is_idempotent() {
        let (solidifier, genesis) = solidifier();
        let tx = tx_with_parents(genesis, genesis);
        let hash = tx.hash();

        solidifier.receive(tx.clone()).unwrap();
        solidifier.receive(tx).unwrap();

        assert!(solidifier
            .store
            .get_or_create_metadata(hash)
            .unwrap()
            .is_solid());
    }

    #[test]
    fn below_min_weight_is_dropped_as_invalid() {
        let genesis = Hash::zero();
        let store = Arc::new(TangleStore::with_capacity(MemKvStore::new(), 64));
        let solidifier = Solidifier::new(store, genesis, Hash::zero().trailing_zero_trits() + 1);
        let mut invalid_events = solidifier.subscribe_invalid();

        let tx = tx_with_parents(genesis, genesis);
        let hash = tx.hash();
        solidifier.receive(tx).unwrap();

        assert_eq!(invalid_events.try_recv().unwrap(), hash);
        assert!(!solidifier.store.contains_transaction(&hash).unwrap());
    }
}
