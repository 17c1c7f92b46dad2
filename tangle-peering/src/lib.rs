//! Autopeering peer registry and protocol engine: known-peer bookkeeping,
//! the distance-based chosen/accepted neighbor policies, and the signed
//! Ping/Request/Response packet formats that drive them.

pub mod packet;
pub mod peer;
pub mod protocol;
pub mod registry;

pub use packet::{Ping, Request, Response};
pub use peer::{LivePeer, Peer};
pub use protocol::{Engine, GossipEvent};
pub use registry::{NeighborSet, PeerRegistry};

use std::time::Duration;

/// Target size of a node's neighborhood: half go to `chosenNeighbors`, half
/// to `acceptedNeighbors`.
pub const NEIGHBOR_COUNT: usize = 4;

/// How often a node re-walks `chosenCandidates` and issues outgoing
/// Requests.
pub const FIND_NEIGHBOR_INTERVAL: Duration = Duration::from_secs(10);

/// Rate limit between successive candidate contacts within one
/// `FIND_NEIGHBOR_INTERVAL` cycle.
pub const CONTACT_RATE_LIMIT: Duration = Duration::from_secs(5);

/// Lifetime of a rotating salt before it must be regenerated.
pub const SALT_LIFETIME: Duration = Duration::from_secs(2 * 60 * 60);

/// How long an idle autopeering connection is kept open before being
/// closed by the transport.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// How many random neighborhood peers are pinged per ping-processor tick.
pub const PING_CONTACT_COUNT_PER_CYCLE: usize = 2;

/// Time budget for a ping processor to sweep the whole neighborhood once;
/// `pingDelay = PING_CYCLE_LENGTH / |neighborhood|`.
pub const PING_CYCLE_LENGTH: Duration = Duration::from_secs(60);

/// Interval at which the ping processor wakes up to check whether a new
/// cycle's `pingDelay` has elapsed.
pub const PING_PROCESS_INTERVAL: Duration = Duration::from_secs(1);
