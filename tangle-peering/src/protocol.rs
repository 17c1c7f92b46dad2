//! The autopeering protocol engine: salt-rotated, distance-based neighbor
//! selection driven by the Ping/Request/Response exchange.

use std::sync::RwLock;

use tangle_crypto::key::ed25519::PublicKey;
use tangle_crypto::{Identifier, Identity, Salt};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::packet::{Request, Response};
use crate::peer::Peer;
use crate::registry::{NeighborSet, PeerRegistry};

/// Events this node's gossip relay reacts to as neighbor sets change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GossipEvent {
    AddNeighbor(Identifier),
    RemoveNeighbor(Identifier),
}

const EVENT_CHANNEL_CAPACITY: usize = 256;

pub struct Engine {
    identity: Identity,
    neighbor_count: usize,
    known_peers: PeerRegistry,
    chosen: NeighborSet,
    accepted: NeighborSet,
    public_salt: RwLock<Salt>,
    private_salt: RwLock<Salt>,
    gossip_events: broadcast::Sender<GossipEvent>,
}

impl Engine {
    pub fn new(identity: Identity, neighbor_count: usize, salt_lifetime: std::time::Duration) -> Self {
        let (gossip_events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            identity,
            neighbor_count,
            known_peers: PeerRegistry::new(),
            chosen: NeighborSet::new(neighbor_count / 2),
            accepted: NeighborSet::new(neighbor_count / 2),
            public_salt: RwLock::new(Salt::generate(rand::rngs::OsRng, salt_lifetime)),
            private_salt: RwLock::new(Salt::generate(rand::rngs::OsRng, salt_lifetime)),
            gossip_events,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn known_peers(&self) -> &PeerRegistry {
        &self.known_peers
    }

    /// `chosenNeighbors ∪ acceptedNeighbors` — the peers the ping processor
    /// sweeps. The ping cycle operates over "the neighborhood", not
    /// `knownPeers`.
    pub fn neighborhood_snapshot(&self) -> Vec<Peer> {
        let mut peers = self.chosen.snapshot();
        peers.extend(self.accepted.snapshot());
        peers
    }

    pub fn chosen(&self) -> &NeighborSet {
        &self.chosen
    }

    pub fn accepted(&self) -> &NeighborSet {
        &self.accepted
    }

    pub fn subscribe_gossip_events(&self) -> broadcast::Receiver<GossipEvent> {
        self.gossip_events.subscribe()
    }

    pub fn public_salt(&self) -> Salt {
        *self.public_salt.read().expect("salt lock poisoned")
    }

    pub fn private_salt(&self) -> Salt {
        *self.private_salt.read().expect("salt lock poisoned")
    }

    /// Regenerate the public salt if it has expired, returning `true` iff
    /// it was rotated (the caller then re-signs the outgoing Ping).
    pub fn rotate_public_salt_if_expired(&self, lifetime: std::time::Duration) -> bool {
        let mut salt = self.public_salt.write().expect("salt lock poisoned");
        if !salt.is_expired() {
            return false;
        }
        *salt = Salt::generate(rand::rngs::OsRng, lifetime);
        true
    }

    pub fn rotate_private_salt_if_expired(&self, lifetime: std::time::Duration) -> bool {
        let mut salt = self.private_salt.write().expect("salt lock poisoned");
        if !salt.is_expired() {
            return false;
        }
        *salt = Salt::generate(rand::rngs::OsRng, lifetime);
        true
    }

    /// Candidates eligible to be contacted with a Request this cycle,
    /// ordered by ascending distance (`chosenCandidates`).
    pub fn chosen_candidates(&self) -> Vec<Peer> {
        let salt = self.public_salt();
        let self_id = self.identity.identifier();

        let furthest_chosen = self.furthest_distance(&self.chosen, |candidate_id| {
            tangle_crypto::distance(&self_id, &salt, candidate_id)
        });

        let mut candidates: Vec<Peer> = self
            .known_peers
            .snapshot()
            .into_iter()
            .filter(|candidate| self.is_eligible_candidate(candidate, &self_id, &salt, furthest_chosen))
            .collect();

        candidates.sort_by_key(|candidate| {
            tangle_crypto::distance(&self_id, &salt, &candidate.identifier)
        });
        candidates
    }

    fn furthest_distance(
        &self,
        set: &NeighborSet,
        distance_to: impl Fn(&Identifier) -> primitive_types::U256,
    ) -> Option<primitive_types::U256> {
        self.furthest_peer(set, distance_to).map(|(_, distance)| distance)
    }

    fn furthest_peer(
        &self,
        set: &NeighborSet,
        distance_to: impl Fn(&Identifier) -> primitive_types::U256,
    ) -> Option<(Identifier, primitive_types::U256)> {
        set.snapshot()
            .iter()
            .map(|peer| (peer.identifier, distance_to(&peer.identifier)))
            .max_by_key(|(_, distance)| *distance)
    }

    /// Insert `peer` into `set`, evicting the furthest current member (and
    /// reporting `RemoveNeighbor`) if `set` is already at capacity and
    /// `peer` is strictly closer under `distance_to`. Never lets `set` grow
    /// past its capacity (property 7). Returns whether `peer` was admitted.
    fn admit(
        &self,
        set: &NeighborSet,
        peer: Peer,
        distance_to: impl Fn(&Identifier) -> primitive_types::U256,
    ) -> bool {
        if !set.is_full() {
            set.insert_unchecked(peer);
            return true;
        }

        match self.furthest_peer(set, &distance_to) {
            Some((furthest_id, furthest_distance)) if distance_to(&peer.identifier) < furthest_distance => {
                set.remove(&furthest_id);
                let _ = self.gossip_events.send(GossipEvent::RemoveNeighbor(furthest_id));
                set.insert_unchecked(peer);
                true
            }
            _ => false,
        }
    }

    fn is_eligible_candidate(
        &self,
        candidate: &Peer,
        self_id: &Identifier,
        salt: &Salt,
        furthest_chosen: Option<primitive_types::U256>,
    ) -> bool {
        if candidate.identifier == *self_id {
            return false;
        }
        if self.accepted.contains(&candidate.identifier) || self.chosen.contains(&candidate.identifier) {
            return false;
        }
        if !self.chosen.is_full() {
            return true;
        }
        match furthest_chosen {
            Some(furthest) => tangle_crypto::distance(self_id, salt, &candidate.identifier) < furthest,
            None => true,
        }
    }

    /// Evaluate an inbound Request under the accepted-neighbor policy and
    /// build the signed Response wire bytes to send back. Distance is
    /// computed as `distance(requester, privateSalt, self)` — the
    /// requester's distance to us under our own private salt.
    pub fn handle_request(&self, request: &Request, requester: Peer) -> Vec<u8> {
        let self_id = self.identity.identifier();
        let private_salt = self.private_salt();
        let _ = request;

        let accept = self.admit(&self.accepted, requester, |candidate_id| {
            tangle_crypto::distance(candidate_id, &private_salt, &self_id)
        });

        if accept {
            let _ = self.gossip_events.send(GossipEvent::AddNeighbor(requester.identifier));
            info!(requester = %requester.identifier, "accepted peering request");
        } else {
            debug!(requester = %requester.identifier, "rejected peering request");
        }

        let peers: Vec<Peer> = self
            .known_peers
            .snapshot()
            .into_iter()
            .take(self.neighbor_count)
            .collect();

        Response::sign(self.identity.public_key(), accept, &peers, |msg| {
            self.identity.sign(msg)
        })
    }

    /// Fold a Response into `knownPeers`/`chosenNeighbors` and report
    /// whether the corresponding outstanding Request was accepted. Distance
    /// is computed as `distance(self, publicSalt, responder)` — the same
    /// perspective used to build `chosenCandidates`.
    pub fn handle_response(&self, response: Response, responder: Peer) -> bool {
        self.known_peers.add_or_update(responder);
        for peer in &response.peers {
            self.known_peers.add_or_update(*peer);
        }

        if response.accept {
            let self_id = self.identity.identifier();
            let public_salt = self.public_salt();
            let admitted = self.admit(&self.chosen, responder, |candidate_id| {
                tangle_crypto::distance(&self_id, &public_salt, candidate_id)
            });
            if admitted {
                let _ = self
                    .gossip_events
                    .send(GossipEvent::AddNeighbor(responder.identifier));
            }
        }

        response.accept
    }

    pub fn public_key(&self) -> PublicKey {
        self.identity.public_key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    fn engine(neighbor_count: usize) -> Engine {
        Engine::new(Identity::generate(OsRng), neighbor_count, Duration::from_secs(600))
    }

    fn peer_for(identity: &Identity) -> Peer {
        Peer::new(
            identity.public_key(),
            IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            14600,
            14626,
        )
    }

    #[test]
    fn chosen_set_never_exceeds_half_neighbor_count() {
        let engine = engine(4);
        for _ in 0..10 {
            let requester_identity = Identity::generate(OsRng);
            let requester = peer_for(&requester_identity);
            let request = Request {
                issuer: requester.public_key,
                salt: engine.private_salt(),
            };
            let accepted = engine.handle_response(
                Response {
                    issuer: requester.public_key,
                    accept: true,
                    peers: vec![],
                },
                requester,
            );
            let _ = (request, accepted);
        }
        assert!(engine.chosen().len() <= 2);
    }

    #[test]
    fn accepted_set_never_exceeds_half_neighbor_count() {
        let engine = engine(4);
        for _ in 0..10 {
            let requester_identity = Identity::generate(OsRng);
            let requester = peer_for(&requester_identity);
            let request = Request {
                issuer: requester.public_key,
                salt: engine.private_salt(),
            };
            let _ = engine.handle_request(&request, requester);
        }
        assert!(engine.accepted().len() <= 2);
    }

    #[test]
    fn self_is_never_an_eligible_candidate() {
        let engine = engine(4);
        let self_peer = Peer::new(
            engine.identity().public_key(),
            IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            14600,
            14626,
        );
        engine.known_peers().add_or_update(self_peer);
        assert!(engine.chosen_candidates().is_empty());
    }
}
