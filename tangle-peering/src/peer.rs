//! A known peer: identity, address and gossip/peering ports, plus whatever
//! salt it most recently advertised.

use std::net::IpAddr;
use std::time::{Instant, SystemTime};

use tangle_crypto::key::ed25519::PublicKey;
use tangle_crypto::{Identifier, Salt};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MalformedPeer {
    #[error("peer payload too short: {0} bytes")]
    TooShort(usize),

    #[error("unknown address discriminator byte {0}")]
    UnknownAddressDiscriminator(u8),

    #[error("invalid public key in peer payload")]
    InvalidPublicKey,
}

const IPV4_DISCRIMINATOR: u8 = 4;
const IPV6_DISCRIMINATOR: u8 = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Peer {
    pub identifier: Identifier,
    pub public_key: PublicKey,
    pub address: IpAddr,
    pub gossip_port: u16,
    pub peering_port: u16,
    pub salt: Option<Salt>,
}

impl Peer {
    pub fn new(
        public_key: PublicKey,
        address: IpAddr,
        gossip_port: u16,
        peering_port: u16,
    ) -> Self {
        Self {
            identifier: tangle_crypto::identity::identifier_from_public_key(&public_key),
            public_key,
            address,
            gossip_port,
            peering_port,
            salt: None,
        }
    }

    /// `identifier ‖ publicKey ‖ address(IPv4/IPv6 discriminated) ‖
    /// gossipPort(u16 BE) ‖ peeringPort(u16 BE) ‖ salt bytes ‖ salt
    /// expiration(u64 BE)`.
    pub fn marshal(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(self.identifier.as_ref());
        out.extend_from_slice(self.public_key.as_ref());

        match self.address {
            IpAddr::V4(addr) => {
                out.push(IPV4_DISCRIMINATOR);
                out.extend_from_slice(&addr.octets());
            }
            IpAddr::V6(addr) => {
                out.push(IPV6_DISCRIMINATOR);
                out.extend_from_slice(&addr.octets());
            }
        }

        out.extend_from_slice(&self.gossip_port.to_be_bytes());
        out.extend_from_slice(&self.peering_port.to_be_bytes());

        let salt = self.salt.unwrap_or(Salt {
            bytes: [0; tangle_crypto::salt::SALT_BYTES],
            expires_at: SystemTime::UNIX_EPOCH,
        });
        out.extend_from_slice(&salt.bytes);
        out.extend_from_slice(&salt.expiration_unix().to_be_bytes());

        out
    }

    pub fn unmarshal(bytes: &[u8]) -> Result<(Self, usize), MalformedPeer> {
        let mut offset = 0;
        let identifier_len = tangle_crypto::identity::IDENTIFIER_BYTES;
        let public_key_len = PublicKey::SIZE;

        if bytes.len() < identifier_len + public_key_len + 1 {
            return Err(MalformedPeer::TooShort(bytes.len()));
        }

        let identifier_bytes = &bytes[offset..offset + identifier_len];
        offset += identifier_len;
        let public_key_bytes = &bytes[offset..offset + public_key_len];
        offset += public_key_len;

        let public_key = PublicKey::try_from(public_key_bytes)
            .map_err(|_| MalformedPeer::InvalidPublicKey)?;

        let discriminator = bytes[offset];
        offset += 1;
        let address = match discriminator {
            IPV4_DISCRIMINATOR => {
                if bytes.len() < offset + 4 {
                    return Err(MalformedPeer::TooShort(bytes.len()));
                }
                let octets: [u8; 4] = bytes[offset..offset + 4].try_into().unwrap();
                offset += 4;
                IpAddr::from(octets)
            }
            IPV6_DISCRIMINATOR => {
                if bytes.len() < offset + 16 {
                    return Err(MalformedPeer::TooShort(bytes.len()));
                }
                let octets: [u8; 16] = bytes[offset..offset + 16].try_into().unwrap();
                offset += 16;
                IpAddr::from(octets)
            }
            other => return Err(MalformedPeer::UnknownAddressDiscriminator(other)),
        };

        let tail_len = 2 + 2 + tangle_crypto::salt::SALT_BYTES + 8;
        if bytes.len() < offset + tail_len {
            return Err(MalformedPeer::TooShort(bytes.len()));
        }

        let gossip_port = u16::from_be_bytes(bytes[offset..offset + 2].try_into().unwrap());
        offset += 2;
        let peering_port = u16::from_be_bytes(bytes[offset..offset + 2].try_into().unwrap());
        offset += 2;

        let salt_bytes_len = tangle_crypto::salt::SALT_BYTES;
        let salt_bytes: [u8; tangle_crypto::salt::SALT_BYTES] =
            bytes[offset..offset + salt_bytes_len].try_into().unwrap();
        offset += salt_bytes_len;
        let expiration = u64::from_be_bytes(bytes[offset..offset + 8].try_into().unwrap());
        offset += 8;

        let salt = if salt_bytes == [0u8; tangle_crypto::salt::SALT_BYTES] && expiration == 0 {
            None
        } else {
            Some(Salt::from_wire(salt_bytes, expiration))
        };

        let identifier = {
            let mut array = [0u8; tangle_crypto::identity::IDENTIFIER_BYTES];
            array.copy_from_slice(identifier_bytes);
            tangle_crypto::hash::Hash::from(array)
        };

        Ok((
            Self {
                identifier,
                public_key,
                address,
                gossip_port,
                peering_port,
                salt,
            },
            offset,
        ))
    }
}

/// A peer plus bookkeeping this node keeps about it that is not part of its
/// wire representation: when it was last seen alive.
pub struct LivePeer {
    pub peer: Peer,
    pub last_seen: Instant,
}

impl LivePeer {
    pub fn new(peer: Peer) -> Self {
        Self {
            peer,
            last_seen: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;
    use tangle_crypto::Identity;
    use std::net::Ipv4Addr;

    fn sample_peer() -> Peer {
        let identity = Identity::generate(OsRng);
        Peer::new(identity.public_key(), IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 14600, 14626)
    }

    #[test]
    fn marshal_unmarshal_roundtrip_without_salt() {
        let peer = sample_peer();
        let bytes = peer.marshal();
        let (restored, consumed) = Peer::unmarshal(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(restored.identifier, peer.identifier);
        assert_eq!(restored.public_key, peer.public_key);
        assert_eq!(restored.address, peer.address);
        assert_eq!(restored.gossip_port, peer.gossip_port);
        assert_eq!(restored.peering_port, peer.peering_port);
        assert_eq!(restored.salt, None);
    }

    #[test]
    fn marshal_unmarshal_roundtrip_with_salt() {
        let mut peer = sample_peer();
        peer.salt = Some(Salt::generate(OsRng, std::time::Duration::from_secs(600)));

        let bytes = peer.marshal();
        let (restored, _) = Peer::unmarshal(&bytes).unwrap();
        assert_eq!(restored.salt.unwrap().bytes, peer.salt.unwrap().bytes);
    }

    #[test]
    fn unmarshal_rejects_short_payload() {
        assert!(matches!(
            Peer::unmarshal(&[0u8; 4]),
            Err(MalformedPeer::TooShort(_))
        ));
    }

    #[test]
    fn ipv6_roundtrips() {
        let identity = Identity::generate(OsRng);
        let peer = Peer::new(
            identity.public_key(),
            IpAddr::V6(std::net::Ipv6Addr::LOCALHOST),
            1,
            2,
        );
        let bytes = peer.marshal();
        let (restored, _) = Peer::unmarshal(&bytes).unwrap();
        assert_eq!(restored.address, peer.address);
    }
}
