//! Unified error type for the Rookery server.

use rookery_protocol::ProtocolError;
use rookery_room::RoomError;
use rookery_session::SessionError;
use rookery_store::StoreError;
use rookery_transport::TransportError;

/// Top-level error that wraps every crate-specific error.
///
/// Each variant converts with `?`, so the server and its handlers deal
/// with this one type.
#[derive(Debug, thiserror::Error)]
pub enum RookeryError {
    /// Connection-level failure (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded, or broke a protocol rule.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The durable store could not be opened or written.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Authentication or session lookup failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Room(#[from] RoomError),
}
