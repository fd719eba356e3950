//! Game sessions for Rookery.
//!
//! This crate owns the in-memory side of a game and the rules for bringing
//! it back from the durable store:
//!
//! 1. **Identity**: the [`Authenticator`] hook that turns a handshake
//!    token into an [`Identity`](rookery_protocol::Identity).
//! 2. **Session state**: [`GameSession`], a move log plus the position it
//!    replays to, with mutators that keep the two in step.
//! 3. **Registry**: [`SessionRegistry`], one authoritative instance per
//!    session id, per-session exclusive access, hydration by replay, and
//!    eviction once nobody is connected.
//!
//! ```text
//! Room layer (above)     ← relays moves, pairs players
//!     ↕
//! Session layer (here)   ← owns GameSession instances
//!     ↕
//! Rules + Store (below)  ← legality / durable records
//! ```

#![allow(async_fn_in_trait)]

mod auth;
mod error;
mod registry;
mod session;

pub use auth::{Authenticator, DevAuthenticator};
pub use error::SessionError;
pub use registry::{SessionGuard, SessionRegistry, SessionSlot};
pub use session::{GameSession, new_session_id};
