//! Binary entrypoint: parse the CLI, resolve a `NodeConfig`, and run the
//! node until Ctrl-C.

use std::sync::Arc;

use clap::Parser;
use tokio::sync::broadcast;

use tangle_node::cli::Cli;
use tangle_node::node::Node;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.resolve()?;

    let node = Arc::new(Node::new(config)?);
    let (shutdown, _) = broadcast::channel(1);

    let ctrl_c_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            let _ = ctrl_c_shutdown.send(());
        }
    });

    node.run(shutdown).await
}
