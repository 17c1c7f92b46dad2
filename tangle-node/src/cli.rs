//! Command-line surface: exactly the four flags the external contract
//! promises, plus the ambient `--config` path every flag can be layered
//! over.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[clap(name = "tangle-node")]
#[clap(version = env!("CARGO_PKG_VERSION"))]
#[clap(about = "Gossip tangle node: autopeering, storage and solidification")]
pub struct Cli {
    /// Path to a TOML config file; CLI flags below override its fields.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Address the ping socket and TCP listeners bind to.
    #[arg(long, env = "TANGLE_ADDRESS")]
    pub address: Option<String>,

    /// UDP port for the autopeering Ping exchange.
    #[arg(long, env = "TANGLE_PORT")]
    pub port: Option<u16>,

    /// TCP port for the Request/Response peering handshake.
    #[arg(long, env = "TANGLE_PEERING_PORT")]
    pub peering_port: Option<u16>,

    /// TCP port transactions are gossiped over.
    #[arg(long, env = "TANGLE_GOSSIP_PORT")]
    pub gossip_port: Option<u16>,
}

impl Cli {
    /// Load the config file named by `--config` (or defaults, if none was
    /// given) and apply any flags present on the command line on top of it.
    pub fn resolve(&self) -> anyhow::Result<crate::config::NodeConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                crate::config::NodeConfig::from_toml_str(&raw)?
            }
            None => crate::config::NodeConfig::default(),
        };

        if let Some(address) = &self.address {
            config.address = address.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(peering_port) = self.peering_port {
            config.peering_port = peering_port;
        }
        if let Some(gossip_port) = self.gossip_port {
            config.gossip_port = gossip_port;
        }

        Ok(config)
    }
}
