//! Configuration API server.

use crate::api::router::route_request;
use crate::session::SessionRegistry;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info};

/// The single HTTP server: configuration endpoints plus intercepted traffic.
pub struct ApiServer {
    listener: TcpListener,
    registry: Arc<SessionRegistry>,
}

impl ApiServer {
    /// Bind the listener up front so callers can read the actual address
    /// (port 0 setups) before serving.
    pub async fn bind(addr: SocketAddr, registry: Arc<SessionRegistry>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, registry })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the accept loop
    pub async fn run(self) -> Result<(), anyhow::Error> {
        info!("Decoy API listening on http://{}", self.local_addr()?);

        loop {
            let (stream, _) = self.listener.accept().await?;
            let io = TokioIo::new(stream);
            let registry = Arc::clone(&self.registry);

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let registry = Arc::clone(&registry);
                    async move { route_request(req, registry).await }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    debug!("API connection error: {}", e);
                }
            });
        }
    }
}
