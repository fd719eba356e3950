//! # Rookery
//!
//! Durable, server-authoritative orchestration of two-player chess
//! sessions over WebSockets.
//!
//! Clients connect, authenticate, and then either queue for a random
//! opponent or open a session and share its id. Every accepted move is
//! written to the store before anyone hears about it, and a session that
//! fell out of memory is rebuilt by replaying its move log.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use rookery::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), RookeryError> {
//!     let store = Arc::new(MemoryStore::new());
//!     let server = RookeryServerBuilder::new()
//!         .bind("127.0.0.1:8080")
//!         .build(StandardChess, store, DevAuthenticator)
//!         .await?;
//!     server.run().await
//! }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use error::RookeryError;
pub use server::{RookeryServer, RookeryServerBuilder};

/// Everything needed to configure and run a server.
pub mod prelude {
    pub use crate::{RookeryError, RookeryServer, RookeryServerBuilder, ServerConfig};

    pub use rookery_protocol::{
        ClientMessage, Codec, Color, Envelope, GameResult, GameStatus, Identity, JsonCodec,
        MoveToken, MoveUpdate, PROTOCOL_VERSION, Players, RejectReason, ServerMessage, SessionId,
        SessionSnapshot, UserId,
    };
    pub use rookery_room::{Lobby, RoomError};
    pub use rookery_rules::{RulesEngine, RulesError, StandardChess};
    pub use rookery_session::{Authenticator, DevAuthenticator, SessionError};
    pub use rookery_store::{JsonFileStore, MemoryStore, SessionRecord, SessionStore, StoreError};
}
