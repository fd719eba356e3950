//! Rules-engine boundary for Rookery.
//!
//! The orchestrator never looks inside a position. Everything it needs
//! (legality, the next position, check, terminal detection, and an encoding
//! for clients) goes through the [`RulesEngine`] trait. [`StandardChess`]
//! is the implementation the server ships with.
//!
//! Every call that can fail returns a [`RulesError`] that distinguishes a
//! token that does not parse ([`RulesError::Malformed`]) from a parsed
//! move that is not legal ([`RulesError::Illegal`]).

mod error;
mod standard;

use std::fmt;

use rookery_protocol::{Color, GameResult, MoveToken};

pub use error::{ReplayError, RulesError};
pub use standard::{ChessPosition, StandardChess};

/// Why a terminal position is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawReason {
    Stalemate,
    InsufficientMaterial,
    FivefoldRepetition,
    SeventyFiveMoveRule,
}

impl fmt::Display for DrawReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stalemate => f.write_str("stalemate"),
            Self::InsufficientMaterial => f.write_str("insufficient material"),
            Self::FivefoldRepetition => f.write_str("fivefold repetition"),
            Self::SeventyFiveMoveRule => f.write_str("seventy-five move rule"),
        }
    }
}

/// A signal that the game has ended in a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    Checkmate { winner: Color },
    Draw(DrawReason),
}

impl Terminal {
    /// The game result this signal records.
    pub fn result(&self) -> GameResult {
        match self {
            Self::Checkmate { winner } => GameResult::win_for(*winner),
            Self::Draw(_) => GameResult::Draw,
        }
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checkmate { winner } => write!(f, "checkmate, {winner} wins"),
            Self::Draw(reason) => write!(f, "draw by {reason}"),
        }
    }
}

/// The operations the orchestrator consumes from a rules engine.
///
/// `Position` is opaque to callers: it is only ever produced by
/// [`initial_position`](Self::initial_position) or
/// [`apply_move`](Self::apply_move) and only ever handed back to the
/// engine. That is what makes "the position is the replay of the move
/// log" enforceable.
pub trait RulesEngine: Send + Sync + 'static {
    /// Engine-owned board state.
    type Position: Clone + fmt::Debug + Send + Sync + 'static;

    /// The position every session starts from.
    fn initial_position(&self) -> Self::Position;

    /// Plays `token` in `position` and returns the resulting position.
    ///
    /// # Errors
    /// - [`RulesError::Malformed`]: the token does not parse
    /// - [`RulesError::Illegal`]: the move is not legal here
    fn apply_move(
        &self,
        position: &Self::Position,
        token: &MoveToken,
    ) -> Result<Self::Position, RulesError>;

    /// Every legal move in `position`, as tokens `apply_move` accepts.
    fn legal_moves(&self, position: &Self::Position) -> Vec<MoveToken>;

    /// Returns `true` if the side to move is in check.
    fn is_check(&self, position: &Self::Position) -> bool;

    /// Returns the terminal signal for `position`, or `None` if play
    /// continues.
    fn terminal_status(&self, position: &Self::Position) -> Option<Terminal>;

    /// Encodes `position` for clients (FEN for chess).
    fn encode(&self, position: &Self::Position) -> String;

    /// Replays a move log from the initial position.
    ///
    /// # Errors
    /// Returns [`ReplayError`] carrying the index of the first move that
    /// failed and the position reached just before it, so callers can
    /// degrade to the last good position instead of refusing to load.
    fn replay(&self, moves: &[MoveToken]) -> Result<Self::Position, ReplayError<Self::Position>> {
        let mut position = self.initial_position();
        for (ply, token) in moves.iter().enumerate() {
            match self.apply_move(&position, token) {
                Ok(next) => position = next,
                Err(source) => {
                    return Err(ReplayError {
                        ply,
                        last_good: position,
                        source,
                    });
                }
            }
        }
        Ok(position)
    }
}
