//! Durable storage for Rookery.
//!
//! The store is the source of truth across restarts. It keeps two kinds of
//! data:
//!
//! - **Session records** ([`SessionRecord`]): who plays which side, the
//!   append-only move log, status, and result.
//! - **Queue entries** ([`QueueEntry`]): users waiting to be paired.
//!
//! The orchestrator only ever talks to the [`SessionStore`] trait. Two
//! backends ship with the crate: [`MemoryStore`] for tests and embedding,
//! and [`JsonFileStore`] for a single server process writing to disk.
//!
//! Every write completes (and for the file store, is synced) before its
//! future resolves. Callers rely on that to broadcast only what a restart
//! would reproduce.

#![allow(async_fn_in_trait)]

mod error;
mod file;
mod memory;

use std::future::Future;
use std::time::{SystemTime, UNIX_EPOCH};

use rookery_protocol::{GameResult, GameStatus, MoveToken, Players, SessionId, UserId};
use serde::{Deserialize, Serialize};

pub use error::StoreError;
pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// The permanent record of one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub white: UserId,
    /// `None` while the session waits for an opponent.
    pub black: Option<UserId>,
    /// Every accepted move in order. Only ever appended to.
    pub moves: Vec<MoveToken>,
    pub status: GameStatus,
    /// Set exactly when `status` is `Finished`.
    pub result: Option<GameResult>,
    /// Milliseconds since the Unix epoch.
    pub created_at: u64,
    pub updated_at: u64,
}

impl SessionRecord {
    pub fn new(
        id: SessionId,
        white: UserId,
        black: Option<UserId>,
        status: GameStatus,
    ) -> Self {
        let now = now_millis();
        Self {
            id,
            white,
            black,
            moves: Vec::new(),
            status,
            result: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn players(&self) -> Players {
        Players {
            white: self.white,
            black: self.black,
        }
    }

    fn touch(&mut self) {
        self.updated_at = now_millis();
    }
}

/// A user waiting in the matchmaking pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub user_id: UserId,
    /// Milliseconds since the Unix epoch.
    pub enqueued_at: u64,
}

impl QueueEntry {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            enqueued_at: now_millis(),
        }
    }
}

/// Durable operations the orchestrator needs.
///
/// Methods return `impl Future + Send` so that callers generic over the
/// store can still be spawned onto the runtime.
pub trait SessionStore: Send + Sync + 'static {
    /// Creates a new session record with an empty move log.
    ///
    /// # Errors
    /// [`StoreError::SessionExists`] if the id is taken.
    fn create_session(
        &self,
        id: &SessionId,
        white: UserId,
        black: Option<UserId>,
        status: GameStatus,
    ) -> impl Future<Output = Result<SessionRecord, StoreError>> + Send;

    /// Appends one move to a session's log.
    fn append_move(
        &self,
        id: &SessionId,
        token: &MoveToken,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Appends one move and, if it ended the game, marks the session
    /// `Finished` with `result`, in one write.
    ///
    /// Either both changes are durable or neither is.
    fn commit_move(
        &self,
        id: &SessionId,
        token: &MoveToken,
        result: Option<GameResult>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Sets a session's status and result together.
    fn set_status(
        &self,
        id: &SessionId,
        status: GameStatus,
        result: Option<GameResult>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Fills the black seat of a waiting session and marks it `Active`,
    /// in one write.
    fn seat_black(
        &self,
        id: &SessionId,
        user: UserId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Reads a session record, `None` if it does not exist.
    fn read_session(
        &self,
        id: &SessionId,
    ) -> impl Future<Output = Result<Option<SessionRecord>, StoreError>> + Send;

    /// Adds a user to the matchmaking pool. Re-adding an existing user
    /// keeps the original entry.
    fn create_queue_entry(
        &self,
        user: UserId,
    ) -> impl Future<Output = Result<QueueEntry, StoreError>> + Send;

    /// Removes a user from the pool. Returns whether an entry existed.
    fn delete_queue_entry(
        &self,
        user: UserId,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// The longest-waiting entry that is not `user`'s own.
    fn find_queue_entry_excluding(
        &self,
        user: UserId,
    ) -> impl Future<Output = Result<Option<QueueEntry>, StoreError>> + Send;

    /// Drops every queue entry.
    fn clear_queue(&self) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
