//! Two independent byte pumps that take over once a login is accepted and
//! the backend is reachable. Bytes are forwarded verbatim in 4 KiB chunks;
//! nothing is inspected, buffered beyond that window, reframed, or reordered.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

const CHUNK_SIZE: usize = 4096;

/// Runs `client <-> backend` until either direction closes. Returns once
/// both pump tasks have finished.
pub async fn run(client: TcpStream, backend: TcpStream) {
    let (client_r, client_w) = client.into_split();
    let (backend_r, backend_w) = backend.into_split();

    let c2b = tokio::spawn(pump(client_r, backend_w, "client->backend"));
    let b2c = tokio::spawn(pump(backend_r, client_w, "backend->client"));

    let _ = tokio::join!(c2b, b2c);
}

/// Reads up to `CHUNK_SIZE` bytes at a time from `src` and writes them all to
/// `dst`, until `src` hits EOF or errors. On termination, shuts down `dst`'s
/// write side so the closure propagates to the peer's pump as EOF.
async fn pump(mut src: OwnedReadHalf, mut dst: OwnedWriteHalf, label: &'static str) {
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = match src.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                log::debug!("{} pump read error: {}", label, e);
                break;
            }
        };
        if let Err(e) = dst.write_all(&buf[..n]).await {
            log::debug!("{} pump write error: {}", label, e);
            break;
        }
    }
    let _ = dst.shutdown().await;
    log::debug!("{} pump closed", label);
}
