//! A length-framed TCP connection carrying signed Request/Response packets.
//!
//! Every read is gated by `idle_timeout`: a connection that produces
//! nothing for that long is treated as dead and dropped.

use std::collections::VecDeque;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time::timeout;
use tracing::trace;

use crate::frame::{frame, FrameAccumulator, FrameError};

const READ_CHUNK_BYTES: usize = 4096;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("connection idle for longer than the configured timeout")]
    IdleTimeout,

    #[error("connection closed by peer")]
    Closed,

    #[error("connection io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// A single TCP connection, framed per [`crate::frame`]. Owns its own
/// receive-buffer state; bytes read past one packet's boundary are queued
/// for the next [`Connection::read_packet`] call rather than discarded.
pub struct Connection {
    stream: TcpStream,
    accumulator: FrameAccumulator,
    pending: VecDeque<Vec<u8>>,
    idle_timeout: Duration,
}

impl Connection {
    pub fn new(stream: TcpStream, idle_timeout: Duration) -> Self {
        stream.set_nodelay(true).ok();
        Self {
            stream,
            accumulator: FrameAccumulator::new(),
            pending: VecDeque::new(),
            idle_timeout,
        }
    }

    pub async fn connect(
        addr: impl ToSocketAddrs,
        idle_timeout: Duration,
    ) -> Result<Self, ConnectionError> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self::new(stream, idle_timeout))
    }

    pub async fn write_packet(&mut self, packet_bytes: &[u8]) -> Result<(), ConnectionError> {
        self.stream.write_all(&frame(packet_bytes)).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Returns the next complete packet, blocking on the socket (subject to
    /// `idle_timeout`) until one is available.
    pub async fn read_packet(&mut self) -> Result<Vec<u8>, ConnectionError> {
        if let Some(packet) = self.pending.pop_front() {
            return Ok(packet);
        }

        let mut buf = vec![0u8; READ_CHUNK_BYTES];
        loop {
            let n = timeout(self.idle_timeout, self.stream.read(&mut buf))
                .await
                .map_err(|_| ConnectionError::IdleTimeout)??;

            if n == 0 {
                return Err(ConnectionError::Closed);
            }

            let mut packets = self.accumulator.push(&buf[..n])?.into_iter();
            if let Some(first) = packets.next() {
                trace!(queued = packets.len(), "packet(s) reassembled");
                self.pending.extend(packets);
                return Ok(first);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn roundtrips_a_packet_over_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut conn = Connection::new(stream, Duration::from_secs(5));
            conn.read_packet().await.unwrap()
        });

        let mut client = Connection::connect(addr, Duration::from_secs(5))
            .await
            .unwrap();
        client.write_packet(b"hello over tcp").await.unwrap();

        let received = server.await.unwrap();
        assert_eq!(received, b"hello over tcp");
    }

    #[tokio::test]
    async fn idle_connection_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut conn = Connection::new(stream, Duration::from_millis(50));
            conn.read_packet().await
        });

        let _client = Connection::connect(addr, Duration::from_secs(5))
            .await
            .unwrap();

        let result = server.await.unwrap();
        assert!(matches!(result, Err(ConnectionError::IdleTimeout)));
    }

    #[tokio::test]
    async fn fragmented_writes_reassemble_into_one_packet() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut conn = Connection::new(stream, Duration::from_secs(5));
            conn.read_packet().await.unwrap()
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        let framed = crate::frame::frame(b"a request split across three writes");
        for chunk in framed.chunks(7) {
            client.write_all(chunk).await.unwrap();
            client.flush().await.unwrap();
        }

        let received = server.await.unwrap();
        assert_eq!(received, b"a request split across three writes");
    }
}
