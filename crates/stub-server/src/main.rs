//! Serve the stubs of a YAML stub file over HTTP.
//!
//! Usage:
//!   stub-server --config stubs.yaml [--address 0.0.0.0] [--port 8080]

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use stub_server::{StubFile, StubListener, StubProtocol};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "stub-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Stub file to load
    #[arg(short, long, env = "STUB_SERVER_CONFIG")]
    config: Option<PathBuf>,

    /// Listen port (overrides the stub file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Listen address (overrides the stub file)
    #[arg(short, long)]
    address: Option<String>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut file = match &args.config {
        Some(path) => StubFile::from_file(path)
            .with_context(|| format!("Failed to load stub file {}", path.display()))?,
        None => StubFile::default(),
    };
    if let Some(port) = args.port {
        file.listen.port = port;
    }
    if let Some(address) = args.address {
        file.listen.address = address;
    }

    let server = file.build_server().context("Invalid stub file")?;
    server.activate();
    info!("Activated {} stub(s)", server.stubs().len());

    let addr = file.listen.socket_addr()?;
    let handle = StubListener::bind(addr, StubProtocol::new())
        .await
        .with_context(|| format!("Failed to bind {addr}"))?
        .spawn();
    info!("Serving stubs on http://{}", handle.local_addr());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;
    handle.shutdown().await;
    Ok(())
}
