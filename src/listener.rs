//! Accepts inbound TCP connections and dispatches each to a fresh connection
//! handler with an isolated lifetime. Never reads from or writes to client
//! sockets itself.

use crate::error::{ProxyError, ProxyResult};
use crate::handler::{self, SharedState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpSocket;
use tokio::task::JoinSet;

const BACKLOG: u32 = 10;

/// Binds `host:port` with address reuse enabled and a backlog of 10, then
/// accepts connections until a shutdown signal fires, spawning one handler
/// task per connection. In-flight handlers are allowed to finish; only new
/// connections are refused once shutdown begins, and `serve` does not
/// return until every spawned handler has completed.
pub async fn serve(state: Arc<SharedState>, host: &str, port: u16) -> ProxyResult<()> {
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|e| ProxyError::ConfigInvalid(format!("invalid listen address: {e}")))?;

    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    let listener = socket.listen(BACKLOG)?;

    log::info!("Listening on {}", addr);

    let mut handlers = JoinSet::new();

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (socket, peer) = accepted?;
                log::debug!("Accepted connection from {}", peer);
                let state = state.clone();
                handlers.spawn(async move {
                    handler::handle_connection(state, socket, peer).await;
                });
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("Shutdown signal received, no longer accepting new connections");
                break;
            }
        }
    }

    log::info!("Waiting for {} in-flight connection(s) to finish", handlers.len());
    while handlers.join_next().await.is_some() {}
    log::info!("All connections drained, shutting down");

    Ok(())
}
