//! WebSocket gateway
//!
//! Exposes session streams to outside observers:
//! - `GET /health` reports liveness and the number of registered sessions
//! - `GET /ws` accepts [`ClientAction`]s and streams session events back
//!
//! Sessions started over a connection are cancelled when it drops.

pub mod protocol;
pub mod websocket;

pub use protocol::{ClientAction, Outbound, ServerFrame, SessionEventFrame};
pub use websocket::{HealthResponse, router};

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;

use crate::manager::SessionManager;
use crate::registry::ConnectionRegistry;

/// Serve the gateway on an already bound listener until `shutdown` resolves
///
/// # Errors
/// Returns an error if the server fails
pub async fn serve<F>(listener: TcpListener, manager: Arc<SessionManager>, shutdown: F) -> Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let registry = ConnectionRegistry::new(Arc::clone(&manager));
    axum::serve(listener, router(registry))
        .with_graceful_shutdown(shutdown)
        .await?;
    manager.shutdown().await?;
    Ok(())
}

/// Bind `addr` and serve until Ctrl-C
///
/// # Errors
/// Returns an error if binding or serving fails
pub async fn start_server(addr: SocketAddr, manager: Arc<SessionManager>) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    log::info!("Debate gateway listening on {}", listener.local_addr()?);

    serve(listener, manager, async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => log::info!("Shutdown signal received"),
            Err(e) => {
                log::error!("Failed to listen for shutdown signal: {e}");
                std::future::pending::<()>().await;
            }
        }
    })
    .await
}
