use std::net::IpAddr;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use memkv::server::{Config, Server};
use memkv::Error;

const PORT: u16 = 6379;

#[derive(Parser, Debug)]
#[command(name = "memkv-server", about = "In-memory key/value cache server")]
struct Args {
    /// The address to listen on
    #[arg(short, long, default_value = "127.0.0.1")]
    address: IpAddr,

    /// The port to listen on
    #[arg(short, long, default_value_t = PORT)]
    port: u16,

    /// Log level (DEBUG, INFO, WARN, ERROR); unknown values fall back to INFO
    #[arg(short, long, default_value = "INFO")]
    log_level: String,

    /// Maximum number of entries held by the cache
    #[arg(short, long, default_value_t = 1024, value_parser = clap::value_parser!(u64).range(1..))]
    max_items: u64,

    /// Eviction policy, LRU or LFU (case-insensitive)
    #[arg(short, long, default_value = "lru")]
    eviction_policy: String,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();

    let config = Config {
        address: args.address,
        port: args.port,
        log_level: args.log_level,
        max_items: args.max_items,
        eviction_policy: args.eviction_policy,
    };

    let server = Server::bind(&config).await?;
    info!("listening on {}", server.local_addr()?);

    let shutdown = CancellationToken::new();
    let server_task = tokio::spawn(server.start(shutdown.clone()));

    wait_for_signal().await?;
    info!("received shutdown signal");
    shutdown.cancel();

    server_task.await??;
    info!("server shutdown complete");
    Ok(())
}

async fn wait_for_signal() -> Result<(), Error> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = interrupt.recv() => {}
        _ = terminate.recv() => {}
        _ = quit.recv() => {}
    }
    Ok(())
}
