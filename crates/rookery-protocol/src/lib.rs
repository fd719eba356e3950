//! Wire protocol for Rookery.
//!
//! This crate defines what clients and the server say to each other:
//!
//! - **Identifiers** ([`UserId`], [`SessionId`], [`MoveToken`]) and game
//!   vocabulary ([`Color`], [`GameStatus`], [`GameResult`]) shared by every
//!   layer above.
//! - **Messages** ([`ClientMessage`], [`ServerMessage`]) wrapped in an
//!   [`Envelope`].
//! - **Codec** ([`Codec`], [`JsonCodec`]) for converting them to bytes.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Lobby (sessions, queue)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientMessage, Color, Envelope, GameResult, GameStatus, Identity, MoveToken, MoveUpdate,
    Players, RejectReason, ServerMessage, SessionId, SessionSnapshot, UserId,
};

/// The current protocol version. Clients must send this in their
/// handshake or be rejected.
pub const PROTOCOL_VERSION: u32 = 1;
