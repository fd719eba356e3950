//! Error types for the room layer.

use rookery_protocol::{RejectReason, SessionId, UserId};
use rookery_rules::RulesError;
use rookery_session::SessionError;
use rookery_store::StoreError;

/// Why a client event was refused.
///
/// Every variant is reported to the connection that sent the event and to
/// nobody else. None of them is fatal to the server.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("not authenticated: {0}")]
    Unauthenticated(String),

    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    #[error("user {0} is already queued")]
    AlreadyQueued(UserId),

    #[error("session {0} is not active")]
    SessionNotActive(SessionId),

    #[error("it is not user {0}'s turn")]
    NotYourTurn(UserId),

    #[error("user {0} does not play in session {1}")]
    NotParticipant(UserId, SessionId),

    /// The rules engine refused the move.
    #[error(transparent)]
    Rules(#[from] RulesError),

    /// The session's stored move log did not fully replay, so it accepts
    /// no further moves.
    #[error("session {0} has a corrupt move log and is read-only")]
    CorruptMoveLog(SessionId),

    /// A durable write did not complete. Nothing was changed in memory.
    #[error("persistence failed: {0}")]
    Persistence(#[from] StoreError),
}

impl RoomError {
    /// The wire-level reason for this error.
    pub fn reason(&self) -> RejectReason {
        match self {
            Self::Unauthenticated(_) => RejectReason::Unauthenticated,
            Self::SessionNotFound(_) => RejectReason::NotFound,
            Self::AlreadyQueued(_) => RejectReason::AlreadyQueued,
            Self::SessionNotActive(_) => RejectReason::SessionNotActive,
            Self::NotYourTurn(_) => RejectReason::NotYourTurn,
            Self::NotParticipant(..) => RejectReason::NotParticipant,
            Self::Rules(RulesError::Malformed(_)) => RejectReason::MalformedMove,
            Self::Rules(RulesError::Illegal(_)) => RejectReason::IllegalMove,
            Self::CorruptMoveLog(_) => RejectReason::CorruptMoveLog,
            Self::Persistence(_) => RejectReason::PersistenceFailure,
        }
    }
}

impl From<SessionError> for RoomError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(id) => Self::SessionNotFound(id),
            SessionError::Store(e) => Self::Persistence(e),
            SessionError::AuthFailed(msg) => Self::Unauthenticated(msg),
        }
    }
}
