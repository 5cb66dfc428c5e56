//! HTTP server implementation.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::admission::AdmissionBackend;
use crate::error::{Result, TurnstileError};

/// HTTP server for the host service.
pub struct HttpServer {
    /// Address to bind to
    addr: SocketAddr,
    /// The admission engine consulted on every limited route
    backend: Arc<dyn AdmissionBackend>,
}

impl HttpServer {
    /// Create a new HTTP server in front of `backend`.
    pub fn new(addr: SocketAddr, backend: Arc<dyn AdmissionBackend>) -> Self {
        Self { addr, backend }
    }

    /// Start the HTTP server.
    ///
    /// This method will block until the server is shut down.
    pub async fn serve(self) -> Result<()> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Start the HTTP server with graceful shutdown.
    ///
    /// The server will shut down when the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        info!(addr = %local_addr, "Starting HTTP server with graceful shutdown");

        let app = super::router(self.backend);

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(signal)
        .await
        .map_err(|e| {
            error!(error = %e, "HTTP server failed");
            TurnstileError::Server(e.to_string())
        })
    }
}
