//! Stateful packet reassembly over a byte stream.
//!
//! Grounded directly on `pallas_network::multiplexer`'s `Header`/
//! `SegmentBuffer` split: every packet is prefixed by an explicit
//! big-endian length field rather than a per-packet-kind lookup table, so
//! the accumulator never needs to know in advance how large a `Response`
//! (whose peer list is variable-length) will be. This is an additive
//! framing layer — the length-prefixed *payload* is exactly the signed
//! packet bytes `tangle_peering::packet` produces. Bytes beyond a packet's
//! boundary are retained and reprocessed as the start of the next one.

use thiserror::Error;

pub const LENGTH_PREFIX_BYTES: usize = 4;

/// Guards against a corrupt or hostile length field forcing an unbounded
/// buffer allocation. Comfortably above a `Response` packet carrying a
/// full `NEIGHBOR_COUNT` of IPv6 peers.
pub const MAX_PACKET_BYTES: usize = 16 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame declares payload length {0}, exceeding the maximum of {MAX_PACKET_BYTES}")]
    PayloadTooLarge(usize),
}

/// Prefix `packet_bytes` with its big-endian length, ready to write to a
/// connection.
pub fn frame(packet_bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(LENGTH_PREFIX_BYTES + packet_bytes.len());
    out.extend_from_slice(&(packet_bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(packet_bytes);
    out
}

/// Accumulates raw bytes received off a connection (in however many chunks
/// they arrive) into complete packets.
#[derive(Default)]
pub struct FrameAccumulator {
    buffer: Vec<u8>,
}

impl FrameAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed newly-received bytes in. Returns every packet that became
    /// complete as a result, in receive order; a trailing partial packet
    /// stays buffered for the next call, and any bytes beyond one packet's
    /// boundary are reprocessed as the start of the next.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Vec<u8>>, FrameError> {
        self.buffer.extend_from_slice(data);
        let mut packets = Vec::new();

        loop {
            if self.buffer.len() < LENGTH_PREFIX_BYTES {
                break;
            }

            let len =
                u32::from_be_bytes(self.buffer[..LENGTH_PREFIX_BYTES].try_into().unwrap()) as usize;
            if len > MAX_PACKET_BYTES {
                return Err(FrameError::PayloadTooLarge(len));
            }

            let total = LENGTH_PREFIX_BYTES + len;
            if self.buffer.len() < total {
                break;
            }

            packets.push(self.buffer[LENGTH_PREFIX_BYTES..total].to_vec());
            self.buffer.drain(..total);
        }

        Ok(packets)
    }
}
