//! Checks whether the real Minecraft server is reachable, and when it is,
//! queries it for authoritative status (player counts) over a side-channel
//! connection that is never shared with the real client connection.

use crate::codec::{self, write_string, write_u16, write_varint};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::time::{Duration, timeout};

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);
/// Arbitrary protocol version advertised on the probe's own handshake to the
/// backend; it never reaches the client, so any recent value works.
const PROBE_PROTOCOL_VERSION: i32 = 767;

pub struct BackendProbe {
    pub host: String,
    pub port: u16,
}

impl BackendProbe {
    pub fn new(host: String, port: u16) -> Self {
        BackendProbe { host, port }
    }

    /// Opens a TCP connection with a 2-second timeout and immediately closes
    /// it. Success means the backend is online; any failure (timeout,
    /// refused, reset) means it's treated as offline.
    pub async fn is_online(&self) -> bool {
        match timeout(PROBE_TIMEOUT, TcpStream::connect((self.host.as_str(), self.port))).await {
            Ok(Ok(_stream)) => true,
            _ => false,
        }
    }

    /// Performs a full status handshake against the backend and returns the
    /// parsed JSON status view on success, or `None` on any error (timeout,
    /// connect failure, malformed response, non-status packet id).
    pub async fn fetch_status(&self) -> Option<Value> {
        let connect = timeout(
            PROBE_TIMEOUT,
            TcpStream::connect((self.host.as_str(), self.port)),
        )
        .await
        .ok()?;
        let mut stream = connect.ok()?;

        let mut handshake_payload = Vec::new();
        write_varint(PROBE_PROTOCOL_VERSION, &mut handshake_payload);
        write_string(&self.host, &mut handshake_payload);
        write_u16(self.port, &mut handshake_payload);
        write_varint(1, &mut handshake_payload); // next_state = status

        codec::write_frame(&mut stream, 0x00, &handshake_payload)
            .await
            .ok()?;
        codec::write_frame(&mut stream, 0x00, &[])
            .await
            .ok()?;

        let frame = timeout(PROBE_TIMEOUT, codec::read_frame(&mut stream))
            .await
            .ok()?
            .ok()?;
        if frame.id != 0x00 {
            return None;
        }

        let (json_str, _) = codec::read_string_slice(&frame.payload).ok()?;
        serde_json::from_str(&json_str).ok()
    }
}
