//! The per-connection state machine: handshake → status branch or login
//! branch → impersonated response, disconnect message, wake+inform, or
//! tunnel handoff.

use crate::codec::{self, read_string_slice, read_u16_slice, read_varint_slice, write_varint};
use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::wake::WakeTrigger;
use crate::whitelist::WhitelistState;
use crate::{backend, status, tunnel};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

const STATUS_PING_TIMEOUT: Duration = Duration::from_secs(5);
const BACKEND_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DISCONNECT_LINGER: Duration = Duration::from_millis(100);

/// Process-wide, read-mostly state shared by every connection handler.
pub struct SharedState {
    pub config: ProxyConfig,
    pub whitelist: WhitelistState,
    pub wake: WakeTrigger,
    pub icon: Option<String>,
}

struct Handshake {
    protocol_version: i32,
    next_state: i32,
    raw_payload: Vec<u8>,
}

fn parse_handshake(payload: &[u8]) -> Result<Handshake, ProxyError> {
    let (protocol_version, off1) = read_varint_slice(payload)?;
    let (_address, off2) = read_string_slice(&payload[off1..])?;
    let (_port, off3) = read_u16_slice(&payload[off1 + off2..])?;
    let (next_state, _) = read_varint_slice(&payload[off1 + off2 + off3..])?;
    Ok(Handshake {
        protocol_version,
        next_state,
        raw_payload: payload.to_vec(),
    })
}

/// Drives one inbound connection end to end. Owns `socket` until the
/// handler exits or transfers it to the tunnel.
pub async fn handle_connection(state: Arc<SharedState>, mut socket: TcpStream, peer: SocketAddr) {
    let frame = match codec::read_frame(&mut socket).await {
        Ok(f) => f,
        Err(e) => {
            log::debug!("{}: closed before handshake ({})", peer, e);
            return;
        }
    };
    if frame.id != 0x00 {
        log::debug!("{}: expected handshake packet id 0x00, got {:#x}", peer, frame.id);
        return;
    }

    let handshake = match parse_handshake(&frame.payload) {
        Ok(h) => h,
        Err(e) => {
            log::debug!("{}: malformed handshake ({})", peer, e);
            return;
        }
    };

    match handshake.next_state {
        1 => handle_status(&state, &mut socket, peer, handshake.protocol_version).await,
        2 => handle_login(&state, socket, peer, handshake.raw_payload).await,
        other => {
            log::debug!("{}: unknown next_state {}, closing", peer, other);
        }
    }
}

async fn handle_status(
    state: &SharedState,
    socket: &mut TcpStream,
    peer: SocketAddr,
    client_protocol: i32,
) {
    let frame = match codec::read_frame(socket).await {
        Ok(f) => f,
        Err(e) => {
            log::debug!("{}: closed before status request ({})", peer, e);
            return;
        }
    };
    if frame.id != 0x00 || !frame.payload.is_empty() {
        log::debug!("{}: expected empty status request, closing", peer);
        return;
    }

    let probe = backend::BackendProbe::new(state.config.backend_host.clone(), state.config.backend_port);
    let online = probe.is_online().await;

    let view = if online {
        let fetched = probe.fetch_status().await;
        status::online_view(&state.config, client_protocol, state.icon.as_deref(), fetched)
    } else {
        status::offline_view(&state.config, client_protocol, state.icon.as_deref())
    };

    let mut payload = Vec::new();
    let json_str = view.to_string();
    write_varint(json_str.len() as i32, &mut payload);
    payload.extend_from_slice(json_str.as_bytes());

    if let Err(e) = codec::write_frame(socket, 0x00, &payload).await {
        log::debug!("{}: failed to send status response ({})", peer, e);
        return;
    }

    match timeout(STATUS_PING_TIMEOUT, codec::read_frame(socket)).await {
        Ok(Ok(ping)) if ping.id == 0x01 => {
            if let Err(e) = codec::write_frame(socket, 0x01, &ping.payload).await {
                log::debug!("{}: failed to echo ping ({})", peer, e);
            }
        }
        Ok(Ok(other)) => {
            log::debug!("{}: expected ping (0x01), got {:#x}", peer, other.id);
        }
        Ok(Err(e)) => {
            log::debug!("{}: status phase ended ({})", peer, e);
        }
        Err(_) => {
            log::debug!("{}: timed out waiting for ping", peer);
        }
    }
}

async fn handle_login(
    state: &SharedState,
    mut socket: TcpStream,
    peer: SocketAddr,
    handshake_payload: Vec<u8>,
) {
    let frame = match codec::read_frame(&mut socket).await {
        Ok(f) => f,
        Err(e) => {
            log::debug!("{}: closed before login start ({})", peer, e);
            return;
        }
    };
    if frame.id != 0x00 {
        log::debug!("{}: expected login start packet id 0x00, got {:#x}", peer, frame.id);
        return;
    }
    let login_payload = frame.payload;

    let player_name = match read_string_slice(&login_payload) {
        Ok((name, _)) => name,
        Err(e) => {
            log::debug!("{}: failed to extract player name ({})", peer, e);
            return;
        }
    };

    if !state.whitelist.allowed(&player_name) {
        log::info!("{}: {} is not whitelisted, rejecting", peer, player_name);
        send_login_disconnect(&mut socket, &state.config.not_whitelisted_message).await;
        return;
    }

    let probe = backend::BackendProbe::new(state.config.backend_host.clone(), state.config.backend_port);
    if probe.is_online().await {
        log::info!("{}: {} logging in, backend online, tunneling", peer, player_name);
        let connect = timeout(
            BACKEND_CONNECT_TIMEOUT,
            TcpStream::connect((state.config.backend_host.as_str(), state.config.backend_port)),
        )
        .await;
        let backend_socket = match connect {
            Ok(Ok(s)) => s,
            _ => {
                log::warn!(
                    "{}: backend became unreachable between probe and connect, closing",
                    peer
                );
                return;
            }
        };

        let mut backend_socket = backend_socket;
        if codec::write_frame(&mut backend_socket, 0x00, &handshake_payload)
            .await
            .is_err()
            || codec::write_frame(&mut backend_socket, 0x00, &login_payload)
                .await
                .is_err()
        {
            log::warn!("{}: failed to replay handshake/login start to backend", peer);
            return;
        }

        tunnel::run(socket, backend_socket).await;
    } else {
        log::info!("{}: {} logging in, backend offline, waking", peer, player_name);
        state.wake.request(&player_name).await;
        send_login_disconnect(&mut socket, &state.config.waking_message).await;
    }
}

async fn send_login_disconnect(socket: &mut TcpStream, message: &str) {
    let json_str = json!({ "text": message }).to_string();
    let mut payload = Vec::new();
    write_varint(json_str.len() as i32, &mut payload);
    payload.extend_from_slice(json_str.as_bytes());

    if codec::write_frame(socket, 0x00, &payload).await.is_ok() {
        tokio::time::sleep(DISCONNECT_LINGER).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{write_string, write_u16};
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    fn test_state() -> Arc<SharedState> {
        Arc::new(SharedState {
            config: ProxyConfig {
                backend_host: "127.0.0.1".to_string(),
                backend_port: 1, // nothing listens here
                ..ProxyConfig::default()
            },
            whitelist: WhitelistState {
                enabled: true,
                players: vec!["Notch".to_string()],
            },
            wake: WakeTrigger::new(
                "00:00:00:00:00:00".to_string(),
                "true".to_string(),
                Duration::from_secs(60),
            ),
            icon: None,
        })
    }

    fn handshake_payload(protocol: i32, next_state: i32) -> Vec<u8> {
        let mut buf = Vec::new();
        write_varint(protocol, &mut buf);
        write_string("play.example.com", &mut buf);
        write_u16(25565, &mut buf);
        write_varint(next_state, &mut buf);
        buf
    }

    async fn connected_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accept = tokio::spawn(async move { listener.accept().await.unwrap().0 });
        let client = TcpStream::connect(addr).await.unwrap();
        let server = accept.await.unwrap();
        (client, server)
    }

    #[tokio::test]
    async fn status_phase_answers_offline_and_echoes_ping() {
        let (mut client, server) = connected_pair().await;
        let peer = "127.0.0.1:1".parse().unwrap();
        let state = test_state();

        let server_task = tokio::spawn(handle_connection(state, server, peer));

        codec::write_frame(&mut client, 0x00, &handshake_payload(767, 1))
            .await
            .unwrap();
        codec::write_frame(&mut client, 0x00, &[]).await.unwrap();

        let response = codec::read_frame(&mut client).await.unwrap();
        assert_eq!(response.id, 0x00);
        let (json_str, _) = read_string_slice(&response.payload).unwrap();
        let view: serde_json::Value = serde_json::from_str(&json_str).unwrap();
        assert_eq!(view["version"]["protocol"], 767);
        assert_eq!(view["players"]["online"], 0);

        codec::write_frame(&mut client, 0x01, &[1, 2, 3, 4, 5, 6, 7, 8])
            .await
            .unwrap();
        let pong = codec::read_frame(&mut client).await.unwrap();
        assert_eq!(pong.id, 0x01);
        assert_eq!(pong.payload, vec![1, 2, 3, 4, 5, 6, 7, 8]);

        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn login_rejects_unknown_player_without_waking() {
        let (mut client, server) = connected_pair().await;
        let peer = "127.0.0.1:2".parse().unwrap();
        let state = test_state();
        let wake = state.wake.clone();

        let server_task = tokio::spawn(handle_connection(state, server, peer));

        codec::write_frame(&mut client, 0x00, &handshake_payload(767, 2))
            .await
            .unwrap();
        let mut login_payload = Vec::new();
        write_string("Mallory", &mut login_payload);
        codec::write_frame(&mut client, 0x00, &login_payload)
            .await
            .unwrap();

        let disconnect = codec::read_frame(&mut client).await.unwrap();
        assert_eq!(disconnect.id, 0x00);
        let (json_str, _) = read_string_slice(&disconnect.payload).unwrap();
        assert!(json_str.contains("No estas en la whitelist"));

        server_task.await.unwrap();
        assert!(!wake.is_waking());
    }

    #[tokio::test]
    async fn login_while_offline_known_player_triggers_wake_and_informs() {
        let (mut client, server) = connected_pair().await;
        let peer = "127.0.0.1:3".parse().unwrap();
        let state = test_state();
        let wake = state.wake.clone();

        let server_task = tokio::spawn(handle_connection(state, server, peer));

        codec::write_frame(&mut client, 0x00, &handshake_payload(767, 2))
            .await
            .unwrap();
        let mut login_payload = Vec::new();
        write_string("Notch", &mut login_payload);
        codec::write_frame(&mut client, 0x00, &login_payload)
            .await
            .unwrap();

        let disconnect = codec::read_frame(&mut client).await.unwrap();
        let (json_str, _) = read_string_slice(&disconnect.payload).unwrap();
        assert!(json_str.contains("Despertando"));

        server_task.await.unwrap();
        assert!(wake.is_waking());
    }

    #[tokio::test]
    async fn malformed_handshake_closes_silently() {
        let (mut client, server) = connected_pair().await;
        let peer = "127.0.0.1:4".parse().unwrap();
        let state = test_state();

        let server_task = tokio::spawn(handle_connection(state, server, peer));

        client.write_all(&[0x01]).await.unwrap();
        drop(client);

        server_task.await.unwrap();
    }
}
