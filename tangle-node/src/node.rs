//! Wires the component crates together into one running node: the periodic
//! background workers (outgoing ping, outgoing request, salt rotation) plus
//! the inbound TCP/UDP listeners, all observing a shared shutdown broadcast
//! the way `pallas-upstream`'s ticking workers do.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinSet;
use tokio::time::interval;
use tracing::{debug, info, trace, warn};

use tangle_gossip::GossipRelay;
use tangle_peering::{
    packet::{Ping, Request, Response},
    protocol::Engine,
    Peer, CONTACT_RATE_LIMIT, FIND_NEIGHBOR_INTERVAL, PING_CONTACT_COUNT_PER_CYCLE,
    PING_PROCESS_INTERVAL,
};
use tangle_solidifier::Solidifier;
use tangle_store::kv::{KvStore, MemKvStore, RocksKvStore};
use tangle_store::TangleStore;
use tangle_transport::{Connection, PingTransport};
use tangle_tx::Transaction;

use crate::config::NodeConfig;

const STORE_NAMESPACES: [&str; 3] = ["transactions", "approvers", "metadata"];

pub struct Node {
    config: NodeConfig,
    engine: Arc<Engine>,
    store: Arc<TangleStore>,
    solidifier: Arc<Solidifier>,
    gossip: Arc<GossipRelay>,
}

impl Node {
    pub fn new(config: NodeConfig) -> anyhow::Result<Self> {
        let identity = config.identity()?;
        info!(id = %identity.string_identifier(), "node identity");

        let kv: Arc<dyn KvStore> = match &config.db_path {
            Some(path) => Arc::new(RocksKvStore::open(path, &STORE_NAMESPACES)?),
            None => MemKvStore::new(),
        };

        let store = Arc::new(TangleStore::with_capacity(kv, config.cache_capacity));
        let solidifier = Arc::new(Solidifier::new(
            store.clone(),
            config.genesis_hash()?,
            config.min_weight_magnitude,
        ));
        let engine = Arc::new(Engine::new(
            identity,
            config.neighbor_count,
            config.salt_lifetime(),
        ));
        let gossip = Arc::new(GossipRelay::new());

        Ok(Self {
            config,
            engine,
            store,
            solidifier,
            gossip,
        })
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn store(&self) -> &Arc<TangleStore> {
        &self.store
    }

    pub fn solidifier(&self) -> &Arc<Solidifier> {
        &self.solidifier
    }

    pub fn gossip(&self) -> &Arc<GossipRelay> {
        &self.gossip
    }

    /// Seed a peer into `knownPeers` directly, bypassing discovery (there is
    /// no bootstrap/DNS mechanism in scope — see Non-goals).
    pub fn seed_known_peer(&self, peer: Peer) {
        self.engine.known_peers().add_or_update(peer);
    }

    fn bind_addr(&self, port: u16) -> anyhow::Result<SocketAddr> {
        let ip: IpAddr = self.config.address.parse()?;
        Ok(SocketAddr::new(ip, port))
    }

    /// Spawn every background worker and run until `shutdown` fires. Each
    /// task exits within one tick of observing the signal.
    pub async fn run(self: Arc<Self>, shutdown: broadcast::Sender<()>) -> anyhow::Result<()> {
        let peering_listener = TcpListener::bind(self.bind_addr(self.config.peering_port)?).await?;
        let ping_transport = Arc::new(PingTransport::bind(self.bind_addr(self.config.port)?).await?);

        info!(
            peering = %peering_listener.local_addr()?,
            ping = %ping_transport.local_addr()?,
            "node listening"
        );

        let mut handles = Vec::new();
        handles.push(tokio::spawn(relay_gossip_events(
            self.clone(),
            shutdown.subscribe(),
        )));
        handles.push(tokio::spawn(relay_solidified_transactions(
            self.clone(),
            shutdown.subscribe(),
        )));
        handles.push(tokio::spawn(accept_peering_connections(
            self.clone(),
            peering_listener,
            shutdown.subscribe(),
        )));
        handles.push(tokio::spawn(receive_pings(
            self.clone(),
            ping_transport.clone(),
            shutdown.subscribe(),
        )));
        handles.push(tokio::spawn(outgoing_request_cycle(
            self.clone(),
            shutdown.subscribe(),
        )));
        handles.push(tokio::spawn(salt_rotation_cycle(
            self.clone(),
            ping_transport,
            shutdown.subscribe(),
        )));

        for handle in handles {
            let _ = handle.await;
        }
        Ok(())
    }
}

/// Folds autopeering `AddNeighbor`/`RemoveNeighbor` events into the gossip
/// relay's neighbor set.
async fn relay_gossip_events(node: Arc<Node>, mut shutdown: broadcast::Receiver<()>) {
    let mut events = node.engine.subscribe_gossip_events();
    loop {
        tokio::select! {
            _ = shutdown.recv() => return,
            event = events.recv() => {
                match event {
                    Ok(event) => node.gossip.apply_event(event),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        }
    }
}

/// Forwards every transaction the solidifier accepts (solid or not) to
/// whatever neighbors the gossip relay currently has.
async fn relay_solidified_transactions(node: Arc<Node>, mut shutdown: broadcast::Receiver<()>) {
    let mut relayed = node.solidifier.subscribe_relay();
    loop {
        tokio::select! {
            _ = shutdown.recv() => return,
            tx = relayed.recv() => {
                match tx {
                    Ok(tx) => node.gossip.relay(tx),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        }
    }
}

/// Accepts inbound Request connections and replies with a signed Response
/// per the accepted-neighbor policy. The requester's advertised ports are
/// not carried on the wire by `Request` (only its public key and salt are),
/// so the peer recorded in `knownPeers` uses the observed TCP source port as
/// a placeholder for `peering_port`; a real gossip/ping round trip later
/// corrects it once the peer's own `Peer` record arrives via a Response.
async fn accept_peering_connections(
    node: Arc<Node>,
    listener: TcpListener,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown.recv() => return,
            accepted = listener.accept() => {
                let (stream, remote) = match accepted {
                    Ok(pair) => pair,
                    Err(err) => {
                        warn!(%err, "failed to accept peering connection");
                        continue;
                    }
                };
                let node = node.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_peering_connection(node, stream, remote).await {
                        debug!(%remote, %err, "peering connection closed");
                    }
                });
            }
        }
    }
}

async fn handle_peering_connection(
    node: Arc<Node>,
    stream: tokio::net::TcpStream,
    remote: SocketAddr,
) -> anyhow::Result<()> {
    let mut connection = Connection::new(stream, node.config.salt_lifetime().min(Duration::from_secs(10)));
    let bytes = connection.read_packet().await?;
    let request = Request::unmarshal(&bytes)?;

    let requester = Peer::new(request.issuer, remote.ip(), node.config.gossip_port, remote.port());
    let response_bytes = node.engine.handle_request(&request, requester);
    connection.write_packet(&response_bytes).await.ok();
    Ok(())
}

/// Receives Pings on the UDP socket; a valid ping just refreshes
/// `knownPeers`' view of the sender (ping itself carries no reply payload
/// in this protocol — the peer-list exchange happens over Request/Response).
async fn receive_pings(node: Arc<Node>, transport: Arc<PingTransport>, mut shutdown: broadcast::Receiver<()>) {
    loop {
        tokio::select! {
            _ = shutdown.recv() => return,
            received = transport.recv_from() => {
                match received {
                    Ok((bytes, from)) => match Ping::unmarshal(&bytes) {
                        Ok(ping) => {
                            let peer = Peer::new(ping.issuer, from.ip(), node.config.gossip_port, node.config.peering_port);
                            node.engine.known_peers().add_or_update(peer);
                            trace!(%from, "ping received");
                        }
                        Err(err) => debug!(%from, %err, "malformed ping dropped"),
                    },
                    Err(err) => warn!(%err, "ping transport error"),
                }
            }
        }
    }
}

/// Fixed size of the outgoing-request worker pool: a bounded pool of
/// concurrent handshakes is canonical here, not a raw `tokio::spawn` per
/// candidate.
const WORKER_POOL_SIZE: usize = 4;

/// The outgoing request cycle: every `FIND_NEIGHBOR_INTERVAL`, snapshot
/// `chosenCandidates` and dispatch a Request to each, paced by
/// `CONTACT_RATE_LIMIT` between dispatches with at most
/// `WORKER_POOL_SIZE` handshakes in flight at once. Shutdown aborts
/// whatever handshakes are still outstanding.
async fn outgoing_request_cycle(node: Arc<Node>, mut shutdown: broadcast::Receiver<()>) {
    let mut ticker = interval(FIND_NEIGHBOR_INTERVAL);
    let pool = Arc::new(Semaphore::new(WORKER_POOL_SIZE));
    let mut workers = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                workers.abort_all();
                return;
            }
            _ = ticker.tick() => {
                let candidates = node.engine.chosen_candidates();
                let mut pacing = interval(CONTACT_RATE_LIMIT);
                for candidate in candidates {
                    tokio::select! {
                        _ = shutdown.recv() => {
                            workers.abort_all();
                            return;
                        }
                        _ = pacing.tick() => {}
                    }

                    let Ok(permit) = pool.clone().acquire_owned().await else { continue };
                    let node = node.clone();
                    workers.spawn(async move {
                        let _permit = permit;
                        if let Err(err) = contact_candidate(&node, candidate).await {
                            debug!(candidate = %candidate.identifier, %err, "candidate contact failed");
                        }
                    });
                }
                while workers.try_join_next().is_some() {}
            }
        }
    }
}

async fn contact_candidate(node: &Arc<Node>, candidate: Peer) -> anyhow::Result<()> {
    let addr = SocketAddr::new(candidate.address, candidate.peering_port);
    let mut connection = Connection::connect(addr, Duration::from_secs(10)).await?;

    let salt = node.engine.public_salt();
    let bytes = Request::sign(node.engine.public_key(), salt, |msg| {
        node.engine.identity().sign(msg)
    });
    connection.write_packet(&bytes).await?;

    let response_bytes = connection.read_packet().await?;
    let response = Response::unmarshal(&response_bytes)?;
    let accepted = node.engine.handle_response(response, candidate);
    if accepted {
        info!(candidate = %candidate.identifier, "peering request accepted");
    }
    Ok(())
}

/// Rotates both salts on expiry and drives the ping cycle: sweep the
/// neighborhood over `PING_CYCLE_LENGTH`, pinging
/// `PING_CONTACT_COUNT_PER_CYCLE` random members per tick.
async fn salt_rotation_cycle(
    node: Arc<Node>,
    ping_transport: Arc<PingTransport>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = interval(PING_PROCESS_INTERVAL);
    loop {
        tokio::select! {
            _ = shutdown.recv() => return,
            _ = ticker.tick() => {
                node.engine.rotate_public_salt_if_expired(node.config.salt_lifetime());
                node.engine.rotate_private_salt_if_expired(node.config.salt_lifetime());
                ping_some_neighbors(&node, &ping_transport).await;
            }
        }
    }
}

async fn ping_some_neighbors(node: &Arc<Node>, ping_transport: &PingTransport) {
    let mut neighborhood = node.engine.neighborhood_snapshot();
    if neighborhood.is_empty() {
        return;
    }
    neighborhood.shuffle(&mut rand::thread_rng());

    let salt = node.engine.public_salt();
    let bytes = Ping::sign(node.engine.public_key(), salt, |msg| node.engine.identity().sign(msg));

    for peer in neighborhood.into_iter().take(PING_CONTACT_COUNT_PER_CYCLE) {
        let addr = SocketAddr::new(peer.address, peer.peering_port);
        let _ = ping_transport.send_to(&bytes, addr).await;
    }
}

/// Hand a transaction received from the gossip relay to the solidifier.
pub fn receive_gossiped_transaction(node: &Arc<Node>, tx: Arc<Transaction>) {
    if let Err(err) = node.solidifier.receive(tx) {
        warn!(%err, "failed to process gossiped transaction");
    }
}
