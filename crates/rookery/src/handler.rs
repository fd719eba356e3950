//! Per-connection handler: handshake, auth, and event routing.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive Handshake → validate version → authenticate token
//!   2. Send HandshakeAck and register an outbound channel with the lobby
//!   3. Loop: decode inbound envelopes and hand them to the lobby, while
//!      draining the outbound channel onto the socket
//!
//! The socket is written from this task only. Anything the lobby sends to
//! this connection (its own replies, a peer's move, a pairing) arrives on
//! the outbound channel.

use std::sync::Arc;
use std::time::Instant;

use rookery_protocol::{
    ClientMessage, Codec, Envelope, Identity, PROTOCOL_VERSION, ProtocolError, RejectReason,
    ServerMessage,
};
use rookery_rules::RulesEngine;
use rookery_session::Authenticator;
use rookery_store::SessionStore;
use rookery_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;

use crate::RookeryError;
use crate::server::ServerState;

/// Drop guard that runs the lobby's disconnect cleanup when the handler
/// exits, including on panic. `Drop` is synchronous, so the async cleanup
/// is spawned.
struct ConnectionGuard<R: RulesEngine, S: SessionStore, A: Authenticator, C: Codec> {
    conn_id: ConnectionId,
    state: Arc<ServerState<R, S, A, C>>,
}

impl<R: RulesEngine, S: SessionStore, A: Authenticator, C: Codec> Drop
    for ConnectionGuard<R, S, A, C>
{
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.lobby.disconnect(conn_id).await;
        });
    }
}

/// Outbound framing state for one connection.
struct Outbox<'a, C: Codec> {
    conn: &'a WebSocketConnection,
    codec: &'a C,
    seq: u64,
    start: Instant,
}

impl<C: Codec> Outbox<'_, C> {
    async fn send(&mut self, message: ServerMessage) -> Result<(), RookeryError> {
        let envelope = Envelope::new(self.seq, self.elapsed_ms(), message);
        self.seq += 1;
        let bytes = self.codec.encode(&envelope)?;
        self.conn.send(&bytes).await?;
        Ok(())
    }

    async fn reject(&mut self, reason: RejectReason, message: &str) -> Result<(), RookeryError> {
        self.send(ServerMessage::rejected(reason, message)).await
    }

    fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<R, S, A, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<R, S, A, C>>,
) -> Result<(), RookeryError>
where
    R: RulesEngine,
    S: SessionStore,
    A: Authenticator,
    C: Codec,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let mut outbox = Outbox {
        conn: &conn,
        codec: &state.codec,
        seq: 0,
        start: Instant::now(),
    };

    // --- Step 1: Handshake ---
    let identity = perform_handshake(&conn, &state, &mut outbox).await?;
    tracing::info!(%conn_id, user_id = %identity.user_id, username = %identity.username, "user authenticated");

    // --- Step 2: Register with the lobby ---
    let (tx, mut rx) = mpsc::unbounded_channel();
    state.lobby.connect(conn_id, tx).await;
    let _guard = ConnectionGuard {
        conn_id,
        state: Arc::clone(&state),
    };

    // --- Step 3: Event loop ---
    let idle_timeout = state.config.idle_timeout;
    let idle = tokio::time::sleep(idle_timeout);
    tokio::pin!(idle);

    loop {
        tokio::select! {
            frame = conn.recv() => {
                idle.as_mut().reset(tokio::time::Instant::now() + idle_timeout);
                let data = match frame {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::info!(%conn_id, "connection closed cleanly");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(%conn_id, error = %e, "recv error");
                        break;
                    }
                };
                let should_close =
                    handle_frame(&state, conn_id, &identity, &data, &mut outbox).await?;
                if should_close {
                    break;
                }
            }
            Some(message) = rx.recv() => {
                outbox.send(message).await?;
            }
            () = &mut idle => {
                tracing::info!(%conn_id, "connection idle, closing");
                break;
            }
        }
    }

    // _guard drops here → lobby disconnect fires.
    Ok(())
}

/// Waits for a valid handshake, then sends `HandshakeAck`.
///
/// Events sent before the handshake are refused with `Unauthenticated`
/// and the wait goes on until the handshake timeout. A bad version or a
/// rejected token ends the connection.
async fn perform_handshake<R, S, A, C>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<R, S, A, C>>,
    outbox: &mut Outbox<'_, C>,
) -> Result<Identity, RookeryError>
where
    R: RulesEngine,
    S: SessionStore,
    A: Authenticator,
    C: Codec,
{
    let deadline = tokio::time::Instant::now() + state.config.handshake_timeout;

    let (version, token) = loop {
        let data = match tokio::time::timeout_at(deadline, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                return Err(ProtocolError::InvalidMessage(
                    "connection closed before handshake".into(),
                )
                .into());
            }
            Ok(Err(e)) => return Err(RookeryError::Transport(e)),
            Err(_) => {
                return Err(ProtocolError::InvalidMessage("handshake timed out".into()).into());
            }
        };

        let envelope: Envelope<ClientMessage> = match state.codec.decode(&data) {
            Ok(envelope) => envelope,
            Err(e) => {
                outbox
                    .reject(RejectReason::InvalidMessage, &e.to_string())
                    .await?;
                continue;
            }
        };

        match envelope.message {
            ClientMessage::Handshake { version, token } => break (version, token),
            other => {
                tracing::debug!(conn_id = %conn.id(), event = ?other, "event before handshake");
                outbox
                    .reject(RejectReason::Unauthenticated, "handshake required")
                    .await?;
            }
        }
    };

    if version != PROTOCOL_VERSION {
        outbox
            .reject(
                RejectReason::InvalidMessage,
                &format!("version mismatch: expected {PROTOCOL_VERSION}, got {version}"),
            )
            .await?;
        return Err(ProtocolError::InvalidMessage("protocol version mismatch".into()).into());
    }

    let identity = match state.auth.authenticate(token.as_deref().unwrap_or("")).await {
        Ok(identity) => identity,
        Err(e) => {
            outbox
                .reject(RejectReason::Unauthenticated, &e.to_string())
                .await?;
            return Err(RookeryError::Session(e));
        }
    };

    let server_time = outbox.elapsed_ms();
    outbox
        .send(ServerMessage::HandshakeAck {
            user_id: identity.user_id,
            server_time,
        })
        .await?;
    Ok(identity)
}

/// Handles one inbound frame. Returns `true` if the connection should
/// close.
async fn handle_frame<R, S, A, C>(
    state: &Arc<ServerState<R, S, A, C>>,
    conn_id: ConnectionId,
    identity: &Identity,
    data: &[u8],
    outbox: &mut Outbox<'_, C>,
) -> Result<bool, RookeryError>
where
    R: RulesEngine,
    S: SessionStore,
    A: Authenticator,
    C: Codec,
{
    let envelope: Envelope<ClientMessage> = match state.codec.decode(data) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::debug!(%conn_id, error = %e, "failed to decode envelope");
            outbox
                .reject(RejectReason::InvalidMessage, &e.to_string())
                .await?;
            return Ok(false);
        }
    };

    match envelope.message {
        ClientMessage::Heartbeat { client_time } => {
            let server_time = outbox.elapsed_ms();
            outbox
                .send(ServerMessage::HeartbeatAck {
                    client_time,
                    server_time,
                })
                .await?;
        }
        ClientMessage::Handshake { .. } => {
            outbox
                .reject(RejectReason::InvalidMessage, "already authenticated")
                .await?;
        }
        ClientMessage::Disconnect { reason } => {
            tracing::info!(%conn_id, %reason, "client disconnected");
            return Ok(true);
        }
        event => state.lobby.handle(conn_id, identity, event).await,
    }
    Ok(false)
}
