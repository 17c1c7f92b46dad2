//! UDP transport for Ping packets.
//!
//! Unlike Request/Response, a Ping is a single self-contained datagram: UDP
//! preserves message boundaries, so no length-prefix framing (`frame`) is
//! needed here — each `recv_from` yields exactly one packet's bytes.

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::{ToSocketAddrs, UdpSocket};

use tangle_peering::packet::MalformedPacket;

#[derive(Debug, Error)]
pub enum PingTransportError {
    #[error("udp io error: {0}")]
    Io(#[from] std::io::Error),
}

const MAX_DATAGRAM_BYTES: usize = 2048;

pub struct PingTransport {
    socket: UdpSocket,
}

impl PingTransport {
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self, PingTransportError> {
        Ok(Self {
            socket: UdpSocket::bind(addr).await?,
        })
    }

    pub async fn send_to(
        &self,
        packet_bytes: &[u8],
        addr: SocketAddr,
    ) -> Result<(), PingTransportError> {
        self.socket.send_to(packet_bytes, addr).await?;
        Ok(())
    }

    /// Receive one datagram. Returns the raw bytes and sender address;
    /// callers unmarshal with [`tangle_peering::packet::Ping::unmarshal`],
    /// which itself reports [`MalformedPacket`] on a bad header or
    /// signature.
    pub async fn recv_from(&self) -> Result<(Vec<u8>, SocketAddr), PingTransportError> {
        let mut buf = vec![0u8; MAX_DATAGRAM_BYTES];
        let (n, addr) = self.socket.recv_from(&mut buf).await?;
        buf.truncate(n);
        Ok((buf, addr))
    }

    pub fn local_addr(&self) -> Result<SocketAddr, PingTransportError> {
        Ok(self.socket.local_addr()?)
    }
}

/// Convenience wrapper pairing a received datagram with its parsed form,
/// used by the ping processor to reject malformed pings without tearing
/// down any connection state (UDP has none to tear down).
pub fn parse_ping(bytes: &[u8]) -> Result<tangle_peering::packet::Ping, MalformedPacket> {
    tangle_peering::packet::Ping::unmarshal(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;
    use tangle_crypto::key::ed25519::SecretKey;
    use tangle_crypto::Salt;

    #[tokio::test]
    async fn ping_roundtrips_over_loopback_udp() {
        let server = PingTransport::bind("127.0.0.1:0").await.unwrap();
        let server_addr = server.local_addr().unwrap();
        let client = PingTransport::bind("127.0.0.1:0").await.unwrap();

        let secret = SecretKey::new(OsRng);
        let issuer = secret.public_key();
        let salt = Salt::generate(OsRng, std::time::Duration::from_secs(600));
        let packet = tangle_peering::packet::Ping::sign(issuer, salt, |msg| secret.sign(msg));

        client.send_to(&packet, server_addr).await.unwrap();
        let (received, _from) = server.recv_from().await.unwrap();

        let ping = parse_ping(&received).unwrap();
        assert_eq!(ping.issuer, issuer);
    }
}
