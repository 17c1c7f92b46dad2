//! Packet transport: a length-framed TCP connection for Request/Response,
//! and a UDP socket for Ping.

pub mod connection;
pub mod frame;
pub mod udp;

pub use connection::{Connection, ConnectionError};
pub use frame::{frame, FrameAccumulator, FrameError};
pub use udp::{parse_ping, PingTransport, PingTransportError};
