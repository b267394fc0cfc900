//! GrpcListenerManager - one dynamically bound listener per enabled session.
//!
//! Ports are allocated first-free from a fixed range. The whole
//! check-scan-bind sequence holds one async lock, so two concurrent enables
//! can never pick the same port; everything after the bind is infallible.

use super::service::UnaryDispatch;
use crate::session::{Session, SessionId, SessionRegistry};
use hyper::server::conn::http2;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// First port a session listener may take.
pub const GRPC_PORT_RANGE_START: u16 = 50051;
/// Last port a session listener may take.
pub const GRPC_PORT_RANGE_END: u16 = 65535;

/// Why a gRPC enable failed. Nothing is recorded on failure, so the same
/// session can retry.
#[derive(Debug, thiserror::Error)]
pub enum GrpcEnableError {
    #[error(
        "Failed to find a free port in range [{};{}]",
        GRPC_PORT_RANGE_START,
        GRPC_PORT_RANGE_END
    )]
    PortExhausted,
    #[error("Failed to bind gRPC port {0}: {1}")]
    Bind(u16, String),
}

/// A live listener as recorded on its session: the bound port, the shutdown
/// signal, and the accept-loop task.
pub struct GrpcListenerHandle {
    port: u16,
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl GrpcListenerHandle {
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Stop the accept loop and wait for it to finish, so the port is
    /// observably free once this returns.
    pub(crate) async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            warn!("gRPC listener task did not stop cleanly: {}", e);
        }
    }
}

/// Allocates ports and runs the accept loops for session listeners.
pub struct GrpcListenerManager {
    host: IpAddr,
    /// Serializes the check-scan-bind sequence of `enable`.
    alloc_lock: tokio::sync::Mutex<()>,
    /// Ports currently assigned to live listeners
    ports: Mutex<HashMap<u16, SessionId>>,
}

impl GrpcListenerManager {
    pub fn new(host: IpAddr) -> Self {
        Self {
            host,
            alloc_lock: tokio::sync::Mutex::new(()),
            ports: Mutex::new(HashMap::new()),
        }
    }

    /// Start a listener for `session`, or return the port of the one it
    /// already has.
    ///
    /// The registry handle is captured by the dispatch path so each call
    /// re-resolves the session by id rather than pinning the `Arc` alive.
    pub async fn enable(
        &self,
        registry: &Arc<SessionRegistry>,
        session: &Arc<Session>,
    ) -> Result<u16, GrpcEnableError> {
        let _guard = self.alloc_lock.lock().await;

        if let Some(port) = session.grpc_port() {
            debug!("Session {} already serves gRPC on port {}", session.id(), port);
            return Ok(port);
        }

        let port = self
            .first_free_port()
            .ok_or(GrpcEnableError::PortExhausted)?;
        let listener = TcpListener::bind((self.host, port))
            .await
            .map_err(|e| GrpcEnableError::Bind(port, e.to_string()))?;

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let dispatch = UnaryDispatch::new(Arc::clone(registry), session.id().clone());
        let task = tokio::spawn(run_listener(listener, port, dispatch, shutdown_rx));

        self.ports.lock().insert(port, session.id().clone());
        session.install_grpc_listener(GrpcListenerHandle {
            port,
            shutdown_tx,
            task,
        });

        info!(
            "gRPC listener for session {} bound to {}:{}",
            session.id(),
            self.host,
            port
        );
        Ok(port)
    }

    /// Stop the session's listener, if any, and release its port.
    pub async fn teardown(&self, session: &Session) {
        let Some(handle) = session.take_grpc_listener() else {
            return;
        };
        let port = handle.port();
        handle.shutdown().await;
        self.ports.lock().remove(&port);
        info!(
            "gRPC listener on port {} for session {} stopped",
            port,
            session.id()
        );
    }

    fn first_free_port(&self) -> Option<u16> {
        let ports = self.ports.lock();
        (GRPC_PORT_RANGE_START..=GRPC_PORT_RANGE_END).find(|port| !ports.contains_key(port))
    }
}

/// Accept loop for one session listener. Connections are served
/// concurrently; the loop itself exits on the shutdown signal (or when the
/// handle holding the sender is dropped).
async fn run_listener(
    listener: TcpListener,
    port: u16,
    dispatch: UnaryDispatch,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _)) => {
                        let dispatch = dispatch.clone();
                        tokio::spawn(async move {
                            let io = TokioIo::new(stream);
                            let service = service_fn(move |req| {
                                let dispatch = dispatch.clone();
                                async move {
                                    Ok::<_, Infallible>(dispatch.call(req).await)
                                }
                            });
                            if let Err(e) = http2::Builder::new(TokioExecutor::new())
                                .serve_connection(io, service)
                                .await
                            {
                                debug!("gRPC connection error on port {}: {}", port, e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Accept error on gRPC port {}: {}", port, e);
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                debug!("gRPC listener on port {} shutting down", port);
                break;
            }
        }
    }
}
