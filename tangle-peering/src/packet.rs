//! The three autopeering wire packets. Each is signed by its issuer over
//! every byte preceding the signature, appended as a fixed-size trailer;
//! the unmarshaler is responsible for verifying that signature.

use tangle_crypto::key::ed25519::{PublicKey, Signature};
use tangle_crypto::Salt;
use thiserror::Error;

use crate::peer::{MalformedPeer, Peer};
use crate::NEIGHBOR_COUNT;

pub const PING_HEADER: u8 = 0x01;
pub const REQUEST_HEADER: u8 = 0x02;
pub const RESPONSE_HEADER: u8 = 0x03;

#[derive(Debug, Error)]
pub enum MalformedPacket {
    #[error("packet payload too short: {0} bytes")]
    TooShort(usize),

    #[error("unknown packet header byte {0}")]
    UnknownHeader(u8),

    #[error("invalid public key in packet")]
    InvalidPublicKey,

    #[error("invalid peer slot: {0}")]
    InvalidPeer(#[from] MalformedPeer),

    #[error("signature does not verify against the claimed issuer")]
    InvalidSignature,
}

fn marshal_salt(out: &mut Vec<u8>, salt: &Salt) {
    out.extend_from_slice(&salt.bytes);
    out.extend_from_slice(&salt.expiration_unix().to_be_bytes());
}

fn unmarshal_salt(bytes: &[u8]) -> Result<(Salt, usize), MalformedPacket> {
    let salt_len = tangle_crypto::salt::SALT_BYTES;
    if bytes.len() < salt_len + 8 {
        return Err(MalformedPacket::TooShort(bytes.len()));
    }
    let mut salt_bytes = [0u8; tangle_crypto::salt::SALT_BYTES];
    salt_bytes.copy_from_slice(&bytes[..salt_len]);
    let expiration = u64::from_be_bytes(bytes[salt_len..salt_len + 8].try_into().unwrap());
    Ok((Salt::from_wire(salt_bytes, expiration), salt_len + 8))
}

fn read_public_key(bytes: &[u8]) -> Result<(PublicKey, usize), MalformedPacket> {
    if bytes.len() < PublicKey::SIZE {
        return Err(MalformedPacket::TooShort(bytes.len()));
    }
    let key = PublicKey::try_from(&bytes[..PublicKey::SIZE])
        .map_err(|_| MalformedPacket::InvalidPublicKey)?;
    Ok((key, PublicKey::SIZE))
}

fn split_signature(bytes: &[u8]) -> Result<(&[u8], Signature), MalformedPacket> {
    if bytes.len() < Signature::SIZE {
        return Err(MalformedPacket::TooShort(bytes.len()));
    }
    let (payload, signature_bytes) = bytes.split_at(bytes.len() - Signature::SIZE);
    let signature =
        Signature::try_from(signature_bytes).map_err(|_| MalformedPacket::InvalidSignature)?;
    Ok((payload, signature))
}

/// Keep-alive + peer-list gossip seed, sent over UDP.
pub struct Ping {
    pub issuer: PublicKey,
    pub salt: Salt,
}

impl Ping {
    pub fn sign(issuer: PublicKey, salt: Salt, sign: impl FnOnce(&[u8]) -> Signature) -> Vec<u8> {
        let mut out = vec![PING_HEADER];
        out.extend_from_slice(issuer.as_ref());
        marshal_salt(&mut out, &salt);
        let signature = sign(&out);
        out.extend_from_slice(signature.as_ref());
        out
    }

    pub fn unmarshal(bytes: &[u8]) -> Result<Self, MalformedPacket> {
        if bytes.first().copied() != Some(PING_HEADER) {
            return Err(MalformedPacket::UnknownHeader(bytes.first().copied().unwrap_or(0)));
        }
        let (payload, signature) = split_signature(bytes)?;
        let (issuer, consumed) = read_public_key(&payload[1..])?;
        let (salt, _) = unmarshal_salt(&payload[1 + consumed..])?;

        if !issuer.verify(payload, &signature) {
            return Err(MalformedPacket::InvalidSignature);
        }

        Ok(Self { issuer, salt })
    }
}

/// "I want to peer with you", sent over TCP.
pub struct Request {
    pub issuer: PublicKey,
    pub salt: Salt,
}

impl Request {
    pub fn sign(issuer: PublicKey, salt: Salt, sign: impl FnOnce(&[u8]) -> Signature) -> Vec<u8> {
        let mut out = vec![REQUEST_HEADER];
        out.extend_from_slice(issuer.as_ref());
        marshal_salt(&mut out, &salt);
        let signature = sign(&out);
        out.extend_from_slice(signature.as_ref());
        out
    }

    pub fn unmarshal(bytes: &[u8]) -> Result<Self, MalformedPacket> {
        if bytes.first().copied() != Some(REQUEST_HEADER) {
            return Err(MalformedPacket::UnknownHeader(bytes.first().copied().unwrap_or(0)));
        }
        let (payload, signature) = split_signature(bytes)?;
        let (issuer, consumed) = read_public_key(&payload[1..])?;
        let (salt, _) = unmarshal_salt(&payload[1 + consumed..])?;

        if !issuer.verify(payload, &signature) {
            return Err(MalformedPacket::InvalidSignature);
        }

        Ok(Self { issuer, salt })
    }
}

/// Accept/reject reply to a [`Request`], carrying up to `NEIGHBOR_COUNT`
/// known peers.
pub struct Response {
    pub issuer: PublicKey,
    pub accept: bool,
    pub peers: Vec<Peer>,
}

impl Response {
    pub fn sign(
        issuer: PublicKey,
        accept: bool,
        peers: &[Peer],
        sign: impl FnOnce(&[u8]) -> Signature,
    ) -> Vec<u8> {
        let mut out = vec![RESPONSE_HEADER];
        out.extend_from_slice(issuer.as_ref());
        out.push(accept as u8);

        let mut slots = peers.iter();
        for _ in 0..NEIGHBOR_COUNT {
            match slots.next() {
                Some(peer) => {
                    out.push(1);
                    out.extend_from_slice(&peer.marshal());
                }
                None => out.push(0),
            }
        }

        let signature = sign(&out);
        out.extend_from_slice(signature.as_ref());
        out
    }

    pub fn unmarshal(bytes: &[u8]) -> Result<Self, MalformedPacket> {
        if bytes.first().copied() != Some(RESPONSE_HEADER) {
            return Err(MalformedPacket::UnknownHeader(bytes.first().copied().unwrap_or(0)));
        }
        let (payload, signature) = split_signature(bytes)?;

        let mut offset = 1;
        let (issuer, consumed) = read_public_key(&payload[offset..])?;
        offset += consumed;

        if payload.len() <= offset {
            return Err(MalformedPacket::TooShort(payload.len()));
        }
        let accept = payload[offset] != 0;
        offset += 1;

        let mut peers = Vec::new();
        for _ in 0..NEIGHBOR_COUNT {
            if payload.len() <= offset {
                return Err(MalformedPacket::TooShort(payload.len()));
            }
            let occupied = payload[offset] != 0;
            offset += 1;
            if occupied {
                let (peer, consumed) = Peer::unmarshal(&payload[offset..])?;
                offset += consumed;
                peers.push(peer);
            }
        }

        if !issuer.verify(payload, &signature) {
            return Err(MalformedPacket::InvalidSignature);
        }

        Ok(Self {
            issuer,
            accept,
            peers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;
    use std::net::{IpAddr, Ipv4Addr};
    use tangle_crypto::key::ed25519::SecretKey;
    use tangle_crypto::Identity;

    fn sample_peer() -> Peer {
        let identity = Identity::generate(OsRng);
        Peer::new(
            identity.public_key(),
            IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            14600,
            14626,
        )
    }

    #[test]
    fn ping_roundtrips_and_verifies() {
        let secret = SecretKey::new(OsRng);
        let issuer = secret.public_key();
        let salt = Salt::generate(OsRng, std::time::Duration::from_secs(600));

        let bytes = Ping::sign(issuer, salt, |msg| secret.sign(msg));
        let ping = Ping::unmarshal(&bytes).unwrap();
        assert_eq!(ping.issuer, issuer);
        assert_eq!(ping.salt.bytes, salt.bytes);
    }

    #[test]
    fn tampered_ping_fails_signature_check() {
        let secret = SecretKey::new(OsRng);
        let issuer = secret.public_key();
        let salt = Salt::generate(OsRng, std::time::Duration::from_secs(600));

        let mut bytes = Ping::sign(issuer, salt, |msg| secret.sign(msg));
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        assert!(matches!(
            Ping::unmarshal(&bytes),
            Err(MalformedPacket::InvalidSignature)
        ));
    }

    #[test]
    fn response_roundtrips_with_peers() {
        let secret = SecretKey::new(OsRng);
        let issuer = secret.public_key();
        let peers = vec![sample_peer()];

        let bytes = Response::sign(issuer, true, &peers, |msg| secret.sign(msg));
        let response = Response::unmarshal(&bytes).unwrap();
        assert!(response.accept);
        assert_eq!(response.peers.len(), 1);
        assert_eq!(response.peers[0].identifier, peers[0].identifier);
    }

    #[test]
    fn response_roundtrips_with_no_peers() {
        let secret = SecretKey::new(OsRng);
        let issuer = secret.public_key();

        let bytes = Response::sign(issuer, false, &[], |msg| secret.sign(msg));
        let response = Response::unmarshal(&bytes).unwrap();
        assert!(!response.accept);
        assert!(response.peers.is_empty());
    }

    #[test]
    fn rejects_unknown_header() {
        assert!(matches!(
            Ping::unmarshal(&[0xffu8; 32]),
            Err(MalformedPacket::UnknownHeader(0xff))
        ));
    }
}
