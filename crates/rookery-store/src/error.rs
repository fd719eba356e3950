//! Error types for the durable store.

use rookery_protocol::SessionId;

/// Errors returned by a [`SessionStore`](crate::SessionStore).
///
/// Any of these during a move commit means the move was not made durable,
/// and the caller must not accept it.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing files failed.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded, or a stored record could not be
    /// decoded.
    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The record a write targets does not exist.
    #[error("session {0} not found in store")]
    SessionNotFound(SessionId),

    /// A record with this id already exists.
    #[error("session {0} already exists in store")]
    SessionExists(SessionId),

    /// The store refused the operation (unreachable, read-only, or an
    /// id it cannot hold).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
