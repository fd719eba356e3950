//! Session orchestration for Rookery.
//!
//! Four pieces share one [`SessionRegistry`](rookery_session::SessionRegistry):
//!
//! - [`Matchmaker`]: the waiting pool; pairs users and creates sessions
//! - [`MoveRelay`]: turn check, legality, durable append, broadcast
//! - [`ConnectionTracker`]: connection ↔ session membership and fan-out
//! - [`Lobby`]: routes each client event to the right piece
//!
//! ```text
//! client event ─→ Lobby ─┬─→ Matchmaker ─┐
//!                        └─→ MoveRelay ──┼─→ registry + store ─→ ConnectionTracker ─→ clients
//! ```

mod error;
mod lobby;
mod matchmaker;
mod relay;
mod tracker;

pub use error::RoomError;
pub use lobby::Lobby;
pub use matchmaker::{Enqueued, Matchmaker, Pairing};
pub use relay::MoveRelay;
pub use tracker::{ClientSender, ConnectionTracker, Departure};
