use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn, Level};

use crate::commands::Command;
use crate::connection::Connection;
use crate::eviction::Eviction;
use crate::frame;
use crate::store::Cache;
use crate::Error;

/// Pause before retrying a failed accept. Coarse on purpose; accept failures
/// are resource exhaustion more often than anything transient.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Connections waiting to be picked up by the dispatch loop.
const CONNECTION_BACKLOG: usize = 32;

#[derive(Debug, Clone)]
pub struct Config {
    pub address: IpAddr,
    pub port: u16,
    /// DEBUG, INFO, WARN or ERROR; anything else falls back to INFO.
    pub log_level: String,
    /// Capacity of the cache in entries.
    pub max_items: u64,
    /// "lru" or "lfu", case-insensitive.
    pub eviction_policy: String,
}

pub struct Server {
    listener: TcpListener,
    cache: Cache,
}

impl Server {
    /// Binds the listener and builds the shared cache from the configuration.
    pub async fn bind(config: &Config) -> Result<Server, Error> {
        let _ = tracing_subscriber::fmt()
            .with_max_level(log_level(&config.log_level))
            .try_init()
            .map_err(|e| debug!("failed to initialize global tracing: {}", e));

        let listener = TcpListener::bind((config.address, config.port)).await?;
        let eviction = Eviction::new(&config.eviction_policy)?;
        let cache = Cache::new(config.max_items as usize, eviction);

        Ok(Server { listener, cache })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.listener.local_addr()?)
    }

    /// Runs the server until the shutdown token fires. One task accepts
    /// connections and publishes them on an internal channel; the main loop
    /// fans them out to per-connection handlers.
    pub async fn start(self, shutdown: CancellationToken) -> Result<(), Error> {
        let (conn_tx, mut conn_rx) = mpsc::channel(CONNECTION_BACKLOG);
        tokio::spawn(accept_loop(self.listener, conn_tx, shutdown.clone()));

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("shutting down server");
                    return Ok(());
                }
                conn = conn_rx.recv() => {
                    let Some((stream, addr)) = conn else {
                        debug!("connection channel closed");
                        return Ok(());
                    };
                    info!("accepted connection from {}", addr);
                    let cache = self.cache.clone();
                    let shutdown = shutdown.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, addr, cache, shutdown).await {
                            error!("connection error: {}", e);
                        }
                    });
                }
            }
        }
    }
}

/// Accepts connections for the lifetime of the server. The listener closes
/// with this task when the token fires.
async fn accept_loop(
    listener: TcpListener,
    conn_tx: mpsc::Sender<(TcpStream, SocketAddr)>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    if conn_tx.send((stream, addr)).await.is_err() {
                        return;
                    }
                }
                Err(e) => {
                    error!("error accepting connection: {}", e);
                    time::sleep(ACCEPT_RETRY_DELAY).await;
                }
            }
        }
    }
}

#[instrument(name = "connection", skip(stream, cache, shutdown), fields(client_addr = %addr))]
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    cache: Cache,
    shutdown: CancellationToken,
) -> Result<(), Error> {
    let mut conn = Connection::new(stream, addr);
    let result = serve_client(&mut conn, cache, shutdown).await;

    // The socket is closed on every exit path, with a last flush attempt.
    if let Err(e) = conn.close().await {
        debug!("error closing connection: {}", e);
    }
    result
}

/// Per-client read/decode/apply/respond loop. Protocol failures are reported
/// to the client and the loop keeps going; only EOF, shutdown or a dead
/// socket end it.
async fn serve_client(
    conn: &mut Connection,
    cache: Cache,
    shutdown: CancellationToken,
) -> Result<(), Error> {
    loop {
        let frame = tokio::select! {
            _ = shutdown.cancelled() => {
                debug!("closing connection on shutdown");
                return Ok(());
            }
            decoded = conn.read_frame() => match decoded {
                Ok(frame) => frame,
                Err(frame::Error::Eof) => {
                    debug!("client closed connection");
                    return Ok(());
                }
                Err(frame::Error::Io(e)) if is_transient(&e) => {
                    warn!("transient network error: {}", e);
                    continue;
                }
                Err(e) => {
                    // Bytes consumed by the failed decode are lost; report
                    // and try the stream again from where it now stands.
                    warn!("failed to decode frame: {}", e);
                    if conn.send_error(&e.to_string()).await.is_err() {
                        return Ok(());
                    }
                    continue;
                }
            }
        };

        let cmd = match Command::try_from(frame) {
            Ok(cmd) => cmd,
            Err(e) => {
                debug!("rejected command: {}", e);
                if conn.send_error(&e.to_string()).await.is_err() {
                    return Ok(());
                }
                continue;
            }
        };

        debug!("applying command: {:?}", cmd);
        let reply = cmd.exec(cache.clone()).await?;
        if let Err(e) = conn.write_frame(&reply).await {
            // The reply is lost; the broken socket surfaces on the next read.
            warn!("failed to write reply: {}", e);
        }
    }
}

fn is_transient(e: &std::io::Error) -> bool {
    matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::ConnectionReset)
}

fn log_level(name: &str) -> Level {
    match name.to_uppercase().as_str() {
        "DEBUG" => Level::DEBUG,
        "WARN" => Level::WARN,
        "ERROR" => Level::ERROR,
        _ => Level::INFO,
    }
}
