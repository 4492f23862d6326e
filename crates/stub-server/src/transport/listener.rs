//! TCP listener serving stubs over HTTP/1.1.

use super::service::handle_stub_request;
use crate::protocol::StubProtocol;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// A bound listener that answers every connection with the stub protocol.
pub struct StubListener {
    listener: TcpListener,
    protocol: Arc<StubProtocol>,
    local_addr: SocketAddr,
}

impl StubListener {
    pub async fn bind(addr: impl ToSocketAddrs, protocol: StubProtocol) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Stub listener bound to {}", local_addr);
        Ok(Self {
            listener,
            protocol: Arc::new(protocol),
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until `shutdown` fires.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let addr = self.local_addr;
        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            let protocol = Arc::clone(&self.protocol);
                            tokio::spawn(async move {
                                let io = TokioIo::new(stream);
                                let service = service_fn(move |req| {
                                    handle_stub_request(req, Arc::clone(&protocol))
                                });
                                if let Err(e) = http1::Builder::new()
                                    .serve_connection(io, service)
                                    .await
                                {
                                    debug!("Connection error from {}: {}", peer, e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Accept error on {}: {}", addr, e);
                        }
                    }
                }
                _ = shutdown.recv() => {
                    info!("Stub listener on {} shutting down", addr);
                    break;
                }
            }
        }
    }

    /// Run on a background task.
    pub fn spawn(self) -> StubListenerHandle {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let local_addr = self.local_addr;
        let task = tokio::spawn(self.run(shutdown_rx));
        StubListenerHandle {
            local_addr,
            shutdown_tx,
            task,
        }
    }
}

/// Handle to a spawned [`StubListener`].
pub struct StubListenerHandle {
    local_addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl StubListenerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// `http://<addr><path>`
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.local_addr, path)
    }

    /// Stop accepting connections and wait for the accept loop to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            error!("Stub listener task failed: {}", e);
        }
    }
}
