//! On-disk node configuration (serde + `toml`), merged with CLI overrides
//! the way `ioi-node`'s binaries layer a TOML file underneath `clap` flags.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    14626
}

fn default_peering_port() -> u16 {
    14627
}

fn default_gossip_port() -> u16 {
    14600
}

fn default_neighbor_count() -> usize {
    tangle_peering::NEIGHBOR_COUNT
}

fn default_min_weight_magnitude() -> usize {
    0
}

fn default_cache_capacity() -> usize {
    tangle_store::DEFAULT_CACHE_SIZE
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Address the UDP ping socket and TCP listeners bind to.
    pub address: String,
    /// UDP port for the autopeering Ping exchange.
    pub port: u16,
    /// TCP port for the Request/Response peering handshake.
    pub peering_port: u16,
    /// TCP port transactions are gossiped over.
    pub gossip_port: u16,
    /// Directory for the `rocksdb` store; omit to run an in-memory store
    /// (used by the integration tests).
    pub db_path: Option<PathBuf>,
    /// Hex-encoded Ed25519 secret key; omit to generate a fresh identity on
    /// every start (fine for a first run, but the node's identifier then
    /// changes across restarts).
    pub identity_secret_key: Option<String>,
    /// Genesis transaction hash, hex/tryte-encoded; defaults to the
    /// all-zero hash used throughout the solidifier's own tests.
    pub genesis: Option<String>,
    pub neighbor_count: usize,
    pub min_weight_magnitude: usize,
    pub cache_capacity: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            peering_port: default_peering_port(),
            gossip_port: default_gossip_port(),
            db_path: None,
            identity_secret_key: None,
            genesis: None,
            neighbor_count: default_neighbor_count(),
            min_weight_magnitude: default_min_weight_magnitude(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl NodeConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn salt_lifetime(&self) -> Duration {
        tangle_peering::SALT_LIFETIME
    }

    pub fn identity(&self) -> anyhow::Result<tangle_crypto::Identity> {
        match &self.identity_secret_key {
            Some(hex_key) => {
                let bytes = hex::decode(hex_key)?;
                let array: [u8; 64] = bytes
                    .try_into()
                    .map_err(|_| anyhow::anyhow!("identity_secret_key must be 64 bytes hex"))?;
                Ok(tangle_crypto::Identity::from_secret_key(array.into()))
            }
            None => Ok(tangle_crypto::Identity::generate(rand::rngs::OsRng)),
        }
    }

    pub fn genesis_hash(&self) -> anyhow::Result<tangle_ternary::Hash> {
        match &self.genesis {
            Some(trytes) => Ok(trytes.parse()?),
            None => Ok(tangle_ternary::Hash::zero()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = NodeConfig::default();
        let raw = toml::to_string(&config).unwrap();
        let parsed = NodeConfig::from_toml_str(&raw).unwrap();
        assert_eq!(parsed.address, config.address);
        assert_eq!(parsed.peering_port, config.peering_port);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config = NodeConfig::from_toml_str("gossip_port = 9000\n").unwrap();
        assert_eq!(config.gossip_port, 9000);
        assert_eq!(config.address, default_address());
    }
}
