//! Error types for the session layer.

use rookery_protocol::SessionId;
use rookery_store::StoreError;

/// Errors from authentication and from resolving sessions.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The [`Authenticator`](crate::Authenticator) rejected the token.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The session is neither loaded nor in the durable store.
    #[error("session {0} not found")]
    NotFound(SessionId),

    /// The durable store could not be read while hydrating.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
