//! The lobby: one entry point per client event.
//!
//! The server's connection task turns each decoded [`ClientMessage`] into a
//! call on [`Lobby::handle`]. The lobby routes it to the matchmaker, the
//! move relay, or the tracker, and every reply (including rejections) goes
//! out through the connection's outbound channel.

use std::sync::Arc;

use rookery_protocol::{
    ClientMessage, Color, GameStatus, Identity, MoveToken, MoveUpdate, ServerMessage, SessionId,
};
use rookery_rules::RulesEngine;
use rookery_session::SessionRegistry;
use rookery_store::SessionStore;
use rookery_transport::ConnectionId;

use crate::relay::snapshot;
use crate::{ClientSender, ConnectionTracker, Matchmaker, MoveRelay, RoomError};

/// Owns the session registry and the three components built around it.
pub struct Lobby<R: RulesEngine, S: SessionStore> {
    registry: Arc<SessionRegistry<R, S>>,
    tracker: Arc<ConnectionTracker>,
    matchmaker: Matchmaker<R, S>,
    relay: MoveRelay<R, S>,
}

impl<R: RulesEngine, S: SessionStore> Lobby<R, S> {
    pub fn new(rules: Arc<R>, store: Arc<S>) -> Self {
        let registry = Arc::new(SessionRegistry::new(rules, store));
        let tracker = Arc::new(ConnectionTracker::new());
        Self {
            matchmaker: Matchmaker::new(Arc::clone(&registry), Arc::clone(&tracker)),
            relay: MoveRelay::new(Arc::clone(&registry), Arc::clone(&tracker)),
            registry,
            tracker,
        }
    }

    pub fn registry(&self) -> &SessionRegistry<R, S> {
        &self.registry
    }

    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    pub fn matchmaker(&self) -> &Matchmaker<R, S> {
        &self.matchmaker
    }

    pub fn relay(&self) -> &MoveRelay<R, S> {
        &self.relay
    }

    /// Drops queue entries left over from a previous run. Nobody who was
    /// waiting then is still connected.
    pub async fn reset_queue(&self) -> Result<(), RoomError> {
        self.registry.store().clear_queue().await?;
        Ok(())
    }

    /// Registers a new connection's outbound channel.
    pub async fn connect(&self, conn: ConnectionId, sender: ClientSender) {
        self.tracker.register(conn, sender).await;
    }

    /// Handles one event from an authenticated connection. Failures are
    /// sent back to `conn` as [`ServerMessage::Rejected`].
    pub async fn handle(&self, conn: ConnectionId, identity: &Identity, msg: ClientMessage) {
        let result = match msg {
            ClientMessage::Enqueue => self.enqueue(conn, identity).await,
            ClientMessage::Dequeue => self.dequeue(conn, identity).await,
            ClientMessage::CreateSession => self.create_session(conn, identity).await.map(drop),
            ClientMessage::JoinSession { session_id } => {
                self.join_session(conn, identity, &session_id).await
            }
            ClientMessage::LeaveSession { session_id } => {
                self.leave_session(conn, &session_id).await;
                Ok(())
            }
            ClientMessage::SubmitMove { session_id, token } => self
                .submit_move(conn, identity, &session_id, token)
                .await
                .map(drop),
            ClientMessage::RequestLegalMoves { session_id } => {
                self.request_legal_moves(conn, identity, &session_id).await
            }
            ClientMessage::Handshake { .. }
            | ClientMessage::Heartbeat { .. }
            | ClientMessage::Disconnect { .. } => {
                tracing::debug!(%conn, "connection control message ignored by lobby");
                Ok(())
            }
        };
        if let Err(e) = result {
            self.reject(conn, &e).await;
        }
    }

    /// Sends `err` to `conn` only.
    pub async fn reject(&self, conn: ConnectionId, err: &RoomError) {
        tracing::debug!(%conn, error = %err, "event rejected");
        self.tracker
            .send_to(conn, ServerMessage::rejected(err.reason(), err.to_string()))
            .await;
    }

    pub async fn enqueue(&self, conn: ConnectionId, identity: &Identity) -> Result<(), RoomError> {
        self.matchmaker.enqueue(conn, identity).await.map(drop)
    }

    /// Leaves the pool. Always answered with `Dequeued`.
    pub async fn dequeue(&self, conn: ConnectionId, identity: &Identity) -> Result<(), RoomError> {
        self.matchmaker.dequeue(identity.user_id).await;
        self.tracker.send_to(conn, ServerMessage::Dequeued).await;
        Ok(())
    }

    pub async fn create_session(
        &self,
        conn: ConnectionId,
        identity: &Identity,
    ) -> Result<SessionId, RoomError> {
        self.matchmaker.open_session(conn, identity).await
    }

    /// Binds `conn` to a session and sends it the full state.
    ///
    /// Players of the session may always join. Anyone else may join only
    /// a waiting session, and is seated as black. The other members are
    /// told who joined. A failed join does not leave the session loaded.
    ///
    /// # Errors
    /// - [`RoomError::SessionNotFound`]
    /// - [`RoomError::NotParticipant`] if the session has no seat for the
    ///   user
    /// - [`RoomError::Persistence`] if seating could not be written
    pub async fn join_session(
        &self,
        conn: ConnectionId,
        identity: &Identity,
        session_id: &SessionId,
    ) -> Result<(), RoomError> {
        let joined = self.seat_and_bind(conn, identity, session_id).await;
        if joined.is_err() {
            self.release_unbound(conn, session_id).await;
        }
        joined
    }

    async fn seat_and_bind(
        &self,
        conn: ConnectionId,
        identity: &Identity,
        session_id: &SessionId,
    ) -> Result<(), RoomError> {
        let user = identity.user_id;
        let mut session = self.registry.acquire(session_id).await?;

        if !session.is_player(user) {
            let seat_open = session.status() == GameStatus::Waiting
                && session.player(Color::Black).is_none();
            if !seat_open {
                return Err(RoomError::NotParticipant(user, session_id.clone()));
            }
            self.registry.store().seat_black(session_id, user).await?;
            session.seat_black(user);
            tracing::info!(%session_id, black = %user, "black seated, game started");
        }

        self.tracker.bind_to_session(conn, session_id).await;
        let color = session.color_of(user);
        let state = snapshot(self.registry.rules(), &session, color);
        self.tracker
            .send_to(conn, ServerMessage::SessionState(state))
            .await;
        self.tracker
            .broadcast_except(
                session_id,
                conn,
                &ServerMessage::PeerJoined {
                    session_id: session_id.clone(),
                    color,
                    user_id: user,
                    username: identity.username.clone(),
                },
            )
            .await;
        tracing::debug!(%session_id, %conn, user_id = %user, "connection joined session");
        Ok(())
    }

    /// Unbinds `conn` from a session, evicting it from memory if that was
    /// the last member. Leaving a session one is not in does nothing.
    pub async fn leave_session(&self, conn: ConnectionId, session_id: &SessionId) {
        if self.tracker.leave(conn, session_id).await {
            self.evict_emptied(vec![session_id.clone()]).await;
        }
    }

    /// Relays a move. The submitting connection always receives the
    /// resulting update, even if it is not bound to the session.
    pub async fn submit_move(
        &self,
        conn: ConnectionId,
        identity: &Identity,
        session_id: &SessionId,
        token: MoveToken,
    ) -> Result<MoveUpdate, RoomError> {
        let relayed = self
            .relay
            .submit_move(session_id, identity.user_id, token)
            .await;
        if !self.tracker.is_member(conn, session_id).await {
            if let Ok(update) = &relayed {
                self.tracker
                    .send_to(conn, ServerMessage::MoveAccepted(update.clone()))
                    .await;
            }
            self.evict_emptied(vec![session_id.clone()]).await;
        }
        relayed
    }

    /// Sends a player the moves available in a session. Only players of
    /// the session may ask.
    pub async fn request_legal_moves(
        &self,
        conn: ConnectionId,
        identity: &Identity,
        session_id: &SessionId,
    ) -> Result<(), RoomError> {
        let listed = self.relay.legal_moves(session_id, identity.user_id).await;
        self.release_unbound(conn, session_id).await;
        let moves = listed?;
        self.tracker
            .send_to(
                conn,
                ServerMessage::LegalMoves {
                    session_id: session_id.clone(),
                    moves,
                },
            )
            .await;
        Ok(())
    }

    /// Cleans up after a closed connection: dequeues its user if it was
    /// waiting, unbinds it everywhere, and evicts sessions it was the last
    /// member of. Durable records are untouched.
    pub async fn disconnect(&self, conn: ConnectionId) {
        self.matchmaker.drop_connection(conn).await;
        let departure = self.tracker.disconnect(conn).await;
        self.evict_emptied(departure.emptied).await;
    }

    /// Evicts a session that `conn` touched without joining, unless some
    /// other connection is bound to it.
    async fn release_unbound(&self, conn: ConnectionId, session_id: &SessionId) {
        if !self.tracker.is_member(conn, session_id).await {
            self.evict_emptied(vec![session_id.clone()]).await;
        }
    }

    async fn evict_emptied(&self, sessions: Vec<SessionId>) {
        for session_id in sessions {
            let tracker = &self.tracker;
            let check = session_id.clone();
            self.registry
                .evict_if_empty(&session_id, move || async move {
                    tracker.has_no_members(&check).await
                })
                .await;
        }
    }
}
