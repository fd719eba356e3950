//! Core protocol types: identifiers, game vocabulary, and the messages
//! that travel over a connection.
//!
//! Everything here derives `Serialize`/`Deserialize`; the serde attributes
//! pin the exact JSON shapes the browser client relies on, and the tests at
//! the bottom of the file guard those shapes.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for an authenticated user.
///
/// Serialized as a plain number (`#[serde(transparent)]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U-{}", self.0)
    }
}

/// Identifier of one game session, shared with its durable record.
///
/// Session ids are opaque strings. They are generated randomly rather
/// than from a counter so that ids minted after a restart never collide
/// with ids already in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One move as submitted by a client and stored in the move log
/// (a UCI-style string such as `e2e4` or `e7e8q`).
///
/// The protocol layer never interprets the token; only the rules engine
/// knows whether it parses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoveToken(pub String);

impl MoveToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MoveToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who a user is, as resolved by the authenticator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub username: String,
}

impl Identity {
    pub fn new(user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Game vocabulary
// ---------------------------------------------------------------------------

/// A side of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    /// The side to move after `ply` half-moves have been played.
    ///
    /// Even ⇒ white, odd ⇒ black. This only holds while every entry in a
    /// move log is a real, alternating move (no passes or resignations).
    pub fn for_ply(ply: usize) -> Self {
        if ply % 2 == 0 { Self::White } else { Self::Black }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::White => f.write_str("white"),
            Self::Black => f.write_str("black"),
        }
    }
}

/// Lifecycle status of a game session.
///
/// ```text
/// Waiting ──(second player seated)──→ Active ──(terminal position)──→ Finished
/// ```
///
/// Sessions created by the matchmaker start directly in `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Waiting,
    Active,
    Finished,
}

impl GameStatus {
    /// Returns `true` if moves may be submitted.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => f.write_str("waiting"),
            Self::Active => f.write_str("active"),
            Self::Finished => f.write_str("finished"),
        }
    }
}

/// Outcome of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameResult {
    White,
    Black,
    Draw,
}

impl GameResult {
    /// The result in which `color` wins.
    pub fn win_for(color: Color) -> Self {
        match color {
            Color::White => Self::White,
            Color::Black => Self::Black,
        }
    }
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::White => f.write_str("1-0"),
            Self::Black => f.write_str("0-1"),
            Self::Draw => f.write_str("1/2-1/2"),
        }
    }
}

/// The two seats of a session. Black is `None` until someone takes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Players {
    pub white: UserId,
    pub black: Option<UserId>,
}

// ---------------------------------------------------------------------------
// Rejections
// ---------------------------------------------------------------------------

/// Why an event was refused. Sent only to the connection that caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// The connection has not completed a handshake.
    Unauthenticated,
    /// The session (or queue entry) does not exist.
    NotFound,
    /// The user already has a queue entry.
    AlreadyQueued,
    /// The session is waiting for a second player or already finished.
    SessionNotActive,
    /// The move parity belongs to the other side.
    NotYourTurn,
    /// The user tried to join a session they do not play in.
    NotParticipant,
    /// The move token could not be parsed at all.
    MalformedMove,
    /// The move parsed but is not legal in the current position.
    IllegalMove,
    /// The session's stored move log failed to replay; it is read-only.
    CorruptMoveLog,
    /// The durable write did not complete; the move was not accepted.
    PersistenceFailure,
    /// The frame could not be decoded or broke a protocol rule.
    InvalidMessage,
}

impl RejectReason {
    /// HTTP-style status code carried alongside the reason.
    pub fn code(self) -> u16 {
        match self {
            Self::InvalidMessage | Self::MalformedMove => 400,
            Self::Unauthenticated => 401,
            Self::NotParticipant => 403,
            Self::NotFound => 404,
            Self::AlreadyQueued | Self::SessionNotActive | Self::NotYourTurn => 409,
            Self::IllegalMove => 422,
            Self::CorruptMoveLog => 500,
            Self::PersistenceFailure => 503,
        }
    }
}

// ---------------------------------------------------------------------------
// Session views
// ---------------------------------------------------------------------------

/// Full state of a session, sent to a connection when it joins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    /// Rules-engine encoding of the position (FEN for standard chess).
    pub position: String,
    /// The seat the receiving connection plays, if any.
    pub color: Option<Color>,
    pub turn: Color,
    pub status: GameStatus,
    pub result: Option<GameResult>,
    pub moves: Vec<MoveToken>,
    pub players: Players,
    pub check: bool,
    pub legal_moves: Vec<MoveToken>,
    /// The stored move log did not fully replay. The session shows the
    /// last good position and accepts no moves.
    #[serde(default)]
    pub degraded: bool,
}

/// The state after an accepted move, broadcast to every member.
///
/// Carries the complete legal-move set for the new position so clients
/// never need a second round-trip to highlight destinations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveUpdate {
    pub session_id: SessionId,
    pub token: MoveToken,
    pub position: String,
    pub turn: Color,
    pub status: GameStatus,
    pub result: Option<GameResult>,
    pub check: bool,
    pub legal_moves: Vec<MoveToken>,
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Client → server events.
///
/// Internally tagged: `{ "type": "SubmitMove", "session_id": "..", "token": "e2e4" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Authenticate this connection. `token` is handed to the server's
    /// authenticator.
    Handshake { version: u32, token: Option<String> },

    /// Keep-alive; echoed back as `HeartbeatAck`.
    Heartbeat { client_time: u64 },

    /// Ask to be matched with the next waiting player.
    Enqueue,

    /// Withdraw from the matchmaking pool.
    Dequeue,

    /// Open a session as white with the black seat left pending.
    CreateSession,

    /// Attach this connection to a session (and take the empty seat of a
    /// waiting session).
    JoinSession { session_id: SessionId },

    /// Detach this connection from a session.
    LeaveSession { session_id: SessionId },

    /// Play a move.
    SubmitMove {
        session_id: SessionId,
        token: MoveToken,
    },

    /// Ask for the legal moves in the current position.
    RequestLegalMoves { session_id: SessionId },

    /// Close the connection.
    Disconnect { reason: String },
}

/// Server → client events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    HandshakeAck {
        user_id: UserId,
        server_time: u64,
    },

    HeartbeatAck {
        client_time: u64,
        server_time: u64,
    },

    /// The user is waiting in the matchmaking pool.
    Queued,

    /// The user's queue entry is gone.
    Dequeued,

    /// A pairing succeeded; this connection is already bound to the
    /// new session.
    Paired {
        session_id: SessionId,
        color: Color,
        opponent: Identity,
    },

    /// A session with a pending black seat was opened.
    SessionCreated {
        session_id: SessionId,
        color: Color,
    },

    SessionState(SessionSnapshot),

    /// Another connection joined a session this connection is bound to.
    PeerJoined {
        session_id: SessionId,
        color: Option<Color>,
        user_id: UserId,
        username: String,
    },

    MoveAccepted(MoveUpdate),

    LegalMoves {
        session_id: SessionId,
        moves: Vec<MoveToken>,
    },

    Rejected {
        reason: RejectReason,
        code: u16,
        message: String,
    },
}

impl ServerMessage {
    /// Builds a `Rejected` message with the code that belongs to `reason`.
    pub fn rejected(reason: RejectReason, message: impl Into<String>) -> Self {
        Self::Rejected {
            reason,
            code: reason.code(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Every frame on the wire is an envelope around one message.
///
/// `seq` is a per-direction counter; `timestamp` is milliseconds since the
/// sender's connection started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<M> {
    pub seq: u64,
    pub timestamp: u64,
    pub message: M,
}

impl<M> Envelope<M> {
    pub fn new(seq: u64, timestamp: u64, message: M) -> Self {
        Self {
            seq,
            timestamp,
            message,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
