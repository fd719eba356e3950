//! Move relay: the per-move protocol.
//!
//! ```text
//! acquire session ─→ active? ─→ your turn? ─→ legal? ─→ append to store
//!        │                                                   │
//!   (guard held) ←──── broadcast ←──── update memory ←───────┘
//! ```
//!
//! The session guard is held from the first check until the broadcast has
//! been queued, so for one session every move is checked against the
//! state left by the previous accepted move, and clients see moves in the
//! order they were accepted. Memory is only updated once the store has
//! the move, and a move that ends the game is stored together with the
//! result.

use std::sync::Arc;

use rookery_protocol::{
    Color, MoveToken, MoveUpdate, ServerMessage, SessionId, SessionSnapshot, UserId,
};
use rookery_rules::RulesEngine;
use rookery_session::{GameSession, SessionRegistry};
use rookery_store::SessionStore;

use crate::{ConnectionTracker, RoomError};

/// Validates, persists, applies, and broadcasts moves.
pub struct MoveRelay<R: RulesEngine, S: SessionStore> {
    registry: Arc<SessionRegistry<R, S>>,
    tracker: Arc<ConnectionTracker>,
}

impl<R: RulesEngine, S: SessionStore> MoveRelay<R, S> {
    pub fn new(registry: Arc<SessionRegistry<R, S>>, tracker: Arc<ConnectionTracker>) -> Self {
        Self { registry, tracker }
    }

    /// Plays `token` for `user` in `session_id`.
    ///
    /// On success every connection bound to the session has been sent
    /// [`ServerMessage::MoveAccepted`] and the same update is returned. On
    /// failure nothing is broadcast and nothing changes.
    ///
    /// # Errors
    /// - [`RoomError::SessionNotFound`]: no such session
    /// - [`RoomError::CorruptMoveLog`]: the session is degraded
    /// - [`RoomError::SessionNotActive`]: waiting or finished
    /// - [`RoomError::NotYourTurn`]: `user` is not the side to move
    /// - [`RoomError::Rules`]: malformed or illegal move
    /// - [`RoomError::Persistence`]: the store did not take the move
    pub async fn submit_move(
        &self,
        session_id: &SessionId,
        user: UserId,
        token: MoveToken,
    ) -> Result<MoveUpdate, RoomError> {
        let mut session = self.registry.acquire(session_id).await?;

        if session.is_degraded() {
            return Err(RoomError::CorruptMoveLog(session_id.clone()));
        }
        if !session.status().is_active() {
            return Err(RoomError::SessionNotActive(session_id.clone()));
        }
        let to_move = session.side_to_move();
        if session.player(to_move) != Some(user) {
            return Err(RoomError::NotYourTurn(user));
        }

        let rules = self.registry.rules();
        let next = rules.apply_move(session.position(), &token)?;
        let terminal = rules.terminal_status(&next);

        self.registry
            .store()
            .commit_move(session_id, &token, terminal.map(|t| t.result()))
            .await?;

        session.record_move(token.clone(), next);
        if let Some(terminal) = terminal {
            session.finish(terminal.result());
            tracing::info!(%session_id, %terminal, "game finished");
        }

        let update = move_update(rules, &session, token);
        let delivered = self
            .tracker
            .broadcast(session_id, &ServerMessage::MoveAccepted(update.clone()))
            .await;
        tracing::debug!(
            %session_id,
            %user,
            token = %update.token,
            ply = session.moves().len(),
            delivered,
            "move accepted"
        );
        Ok(update)
    }

    /// The moves the side to move may play now. Empty unless the session
    /// accepts moves.
    ///
    /// # Errors
    /// [`RoomError::NotParticipant`] unless `user` plays in the session.
    pub async fn legal_moves(
        &self,
        session_id: &SessionId,
        user: UserId,
    ) -> Result<Vec<MoveToken>, RoomError> {
        let session = self.registry.acquire(session_id).await?;
        if !session.is_player(user) {
            return Err(RoomError::NotParticipant(user, session_id.clone()));
        }
        Ok(playable_moves(self.registry.rules(), &session))
    }
}

fn playable_moves<R: RulesEngine>(rules: &R, session: &GameSession<R::Position>) -> Vec<MoveToken> {
    if session.status().is_active() && !session.is_degraded() {
        rules.legal_moves(session.position())
    } else {
        Vec::new()
    }
}

fn move_update<R: RulesEngine>(
    rules: &R,
    session: &GameSession<R::Position>,
    token: MoveToken,
) -> MoveUpdate {
    MoveUpdate {
        session_id: session.id().clone(),
        token,
        position: rules.encode(session.position()),
        turn: session.side_to_move(),
        status: session.status(),
        result: session.result(),
        check: rules.is_check(session.position()),
        legal_moves: playable_moves(rules, session),
    }
}

/// The full view of a session for a connection that plays `viewer`.
pub(crate) fn snapshot<R: RulesEngine>(
    rules: &R,
    session: &GameSession<R::Position>,
    viewer: Option<Color>,
) -> SessionSnapshot {
    SessionSnapshot {
        session_id: session.id().clone(),
        position: rules.encode(session.position()),
        color: viewer,
        turn: session.side_to_move(),
        status: session.status(),
        result: session.result(),
        moves: session.moves().to_vec(),
        players: session.players(),
        check: rules.is_check(session.position()),
        legal_moves: playable_moves(rules, session),
        degraded: session.is_degraded(),
    }
}
