//! Error types for the rules layer.

use std::fmt;

/// Why the rules engine refused a move.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RulesError {
    /// The token is not a move in the engine's notation at all.
    #[error("malformed move token {0:?}")]
    Malformed(String),

    /// The token parsed but the move is not legal in the position.
    #[error("illegal move {0}")]
    Illegal(String),
}

/// A stored move log that could not be replayed to the end.
#[derive(Debug, thiserror::Error)]
#[error("move {ply} failed to replay: {source}")]
pub struct ReplayError<P: fmt::Debug> {
    /// Zero-based index of the first move that failed.
    pub ply: usize,
    /// The position after the last move that did replay.
    pub last_good: P,
    #[source]
    pub source: RulesError,
}
