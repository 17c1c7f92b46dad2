//! End-to-end peering: two full [`Node`]s, each seeded with the other as a
//! known peer, run their background workers against real loopback sockets
//! until A's outgoing Request cycle lands in B's accepted set and vice
//! versa's gossip relay learns about it.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use tangle_node::config::NodeConfig;
use tangle_node::node::Node;
use tangle_peering::Peer;
use tokio::sync::broadcast;
use tokio::time::timeout;

fn config(peering_port: u16, port: u16, gossip_port: u16) -> NodeConfig {
    NodeConfig {
        address: "127.0.0.1".to_string(),
        port,
        peering_port,
        gossip_port,
        db_path: None,
        identity_secret_key: None,
        genesis: None,
        neighbor_count: 4,
        min_weight_magnitude: 0,
        cache_capacity: 64,
    }
}

async fn wait_until(mut check: impl FnMut() -> bool, timeout_duration: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout_duration;
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn two_nodes_peer_and_emit_gossip_events() {
    let node_a = Arc::new(Node::new(config(24627, 24626, 24600)).unwrap());
    let node_b = Arc::new(Node::new(config(24727, 24726, 24700)).unwrap());

    let loopback = IpAddr::V4(Ipv4Addr::LOCALHOST);
    let peer_a = Peer::new(node_a.engine().public_key(), loopback, 24600, 24627);
    let peer_b = Peer::new(node_b.engine().public_key(), loopback, 24700, 24727);

    node_a.seed_known_peer(peer_b);
    node_b.seed_known_peer(peer_a);

    let (shutdown, _) = broadcast::channel::<()>(1);
    let handle_a = tokio::spawn(node_a.clone().run(shutdown.clone()));
    let handle_b = tokio::spawn(node_b.clone().run(shutdown.clone()));

    let peered = wait_until(
        || {
            node_a.engine().chosen().contains(&peer_b.identifier)
                && node_b.engine().accepted().contains(&peer_a.identifier)
        },
        Duration::from_secs(15),
    )
    .await;

    let _ = shutdown.send(());
    let _ = timeout(Duration::from_secs(2), handle_a).await;
    let _ = timeout(Duration::from_secs(2), handle_b).await;

    assert!(peered, "node A did not end up with node B in its chosen set");
    assert!(node_a.gossip().is_neighbor(&peer_b.identifier), "node A's gossip relay never saw AddNeighbor");
    assert!(node_b.gossip().is_neighbor(&peer_a.identifier), "node B's gossip relay never saw AddNeighbor");
}
