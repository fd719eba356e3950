//! Matchmaker: the waiting pool and session creation.
//!
//! The pool lives in memory behind one mutex and is mirrored to the store's
//! queue entries. Every enqueue, dequeue, and pairing runs with that mutex
//! held, from the uniqueness check through the durable writes to the
//! notifications, so a waiting user is paired at most once and never after
//! they left the pool.

use std::collections::HashMap;
use std::sync::Arc;

use rookery_protocol::{Color, GameStatus, Identity, ServerMessage, SessionId, UserId};
use rookery_rules::RulesEngine;
use rookery_session::{GameSession, SessionRegistry, new_session_id};
use rookery_store::{QueueEntry, SessionStore};
use rookery_transport::ConnectionId;
use tokio::sync::Mutex;

use crate::{ConnectionTracker, RoomError};

/// A user in the pool and the connection they queued from.
#[derive(Debug, Clone)]
struct Waiter {
    identity: Identity,
    connection: ConnectionId,
    entry: QueueEntry,
}

/// Two users matched into a new session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pairing {
    pub session_id: SessionId,
    pub white: Identity,
    pub black: Identity,
}

/// Outcome of [`Matchmaker::enqueue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enqueued {
    /// Nobody else was waiting. The user is now in the pool.
    Waiting(QueueEntry),
    /// The user was matched with the longest-waiting other user.
    Paired(Pairing),
}

/// Pairs waiting users and creates sessions.
pub struct Matchmaker<R: RulesEngine, S: SessionStore> {
    registry: Arc<SessionRegistry<R, S>>,
    tracker: Arc<ConnectionTracker>,
    pool: Mutex<HashMap<UserId, Waiter>>,
}

impl<R: RulesEngine, S: SessionStore> Matchmaker<R, S> {
    pub fn new(registry: Arc<SessionRegistry<R, S>>, tracker: Arc<ConnectionTracker>) -> Self {
        Self {
            registry,
            tracker,
            pool: Mutex::new(HashMap::new()),
        }
    }

    /// Pairs `identity` with the longest-waiting other user, or queues them.
    ///
    /// When paired, the waiting user plays white. Both connections are
    /// bound to the new session and sent [`ServerMessage::Paired`]. When
    /// queued, `conn` is sent [`ServerMessage::Queued`].
    ///
    /// # Errors
    /// - [`RoomError::AlreadyQueued`] if the user is already in the pool
    /// - [`RoomError::Persistence`] if the session or queue entry could not
    ///   be written; the pool is unchanged
    pub async fn enqueue(
        &self,
        conn: ConnectionId,
        identity: &Identity,
    ) -> Result<Enqueued, RoomError> {
        let user = identity.user_id;
        let mut pool = self.pool.lock().await;
        if pool.contains_key(&user) {
            return Err(RoomError::AlreadyQueued(user));
        }

        let store = self.registry.store();
        let opponent = loop {
            let Some(entry) = store.find_queue_entry_excluding(user).await? else {
                break None;
            };
            if let Some(waiter) = pool.get(&entry.user_id) {
                break Some(waiter.clone());
            }
            // Left behind by a failed delete; the pool is authoritative.
            tracing::warn!(user_id = %entry.user_id, "dropping stale queue entry");
            if !store.delete_queue_entry(entry.user_id).await? {
                break None;
            }
        };

        let Some(waiter) = opponent else {
            let entry = store.create_queue_entry(user).await?;
            pool.insert(
                user,
                Waiter {
                    identity: identity.clone(),
                    connection: conn,
                    entry,
                },
            );
            self.tracker.bind_to_queue(conn, user).await;
            self.tracker.send_to(conn, ServerMessage::Queued).await;
            tracing::info!(user_id = %user, pool = pool.len(), "user queued");
            return Ok(Enqueued::Waiting(entry));
        };

        let white = waiter.identity.user_id;
        let session_id = new_session_id();
        store
            .create_session(&session_id, white, Some(user), GameStatus::Active)
            .await?;
        if let Err(e) = store.delete_queue_entry(white).await {
            tracing::warn!(user_id = %white, error = %e, "failed to delete paired queue entry");
        }
        pool.remove(&white);

        let initial = self.registry.rules().initial_position();
        self.registry
            .register(GameSession::new(session_id.clone(), white, Some(user), initial))
            .await;

        self.tracker.unbind_queue(waiter.connection).await;
        let seats = [
            (waiter.connection, Color::White, identity.clone()),
            (conn, Color::Black, waiter.identity.clone()),
        ];
        for (seat_conn, color, opponent) in seats {
            self.tracker.bind_to_session(seat_conn, &session_id).await;
            self.tracker
                .send_to(
                    seat_conn,
                    ServerMessage::Paired {
                        session_id: session_id.clone(),
                        color,
                        opponent,
                    },
                )
                .await;
        }

        tracing::info!(
            %session_id,
            white = %white,
            black = %user,
            waited_ms = rookery_store::now_millis().saturating_sub(waiter.entry.enqueued_at),
            "players paired"
        );
        Ok(Enqueued::Paired(Pairing {
            session_id,
            white: waiter.identity,
            black: identity.clone(),
        }))
    }

    /// Takes `user` out of the pool. Returns whether they were in it.
    /// Dequeuing a user who is not queued is not an error.
    pub async fn dequeue(&self, user: UserId) -> bool {
        let mut pool = self.pool.lock().await;
        let removed = pool.remove(&user);
        self.forget(user).await;
        match removed {
            Some(waiter) => {
                self.tracker.unbind_queue(waiter.connection).await;
                tracing::info!(user_id = %user, "user dequeued");
                true
            }
            None => false,
        }
    }

    /// Dequeues whichever user queued from `conn`, if any.
    pub async fn drop_connection(&self, conn: ConnectionId) -> Option<UserId> {
        let mut pool = self.pool.lock().await;
        let user = pool
            .iter()
            .find(|(_, waiter)| waiter.connection == conn)
            .map(|(user, _)| *user)?;
        pool.remove(&user);
        self.forget(user).await;
        self.tracker.unbind_queue(conn).await;
        tracing::info!(user_id = %user, %conn, "queued connection left, user dequeued");
        Some(user)
    }

    /// Creates a session with `identity` as white and the black seat open.
    ///
    /// `conn` is bound to it and sent [`ServerMessage::SessionCreated`].
    pub async fn open_session(
        &self,
        conn: ConnectionId,
        identity: &Identity,
    ) -> Result<SessionId, RoomError> {
        let user = identity.user_id;
        let session_id = new_session_id();
        self.registry
            .store()
            .create_session(&session_id, user, None, GameStatus::Waiting)
            .await?;

        let initial = self.registry.rules().initial_position();
        self.registry
            .register(GameSession::new(session_id.clone(), user, None, initial))
            .await;

        self.tracker.bind_to_session(conn, &session_id).await;
        self.tracker
            .send_to(
                conn,
                ServerMessage::SessionCreated {
                    session_id: session_id.clone(),
                    color: Color::White,
                },
            )
            .await;
        tracing::info!(%session_id, white = %user, "session opened");
        Ok(session_id)
    }

    pub async fn is_queued(&self, user: UserId) -> bool {
        self.pool.lock().await.contains_key(&user)
    }

    pub async fn pool_len(&self) -> usize {
        self.pool.lock().await.len()
    }

    /// Deletes `user`'s durable queue entry. A failure only leaves a stale
    /// entry, which the next pairing scan skips.
    async fn forget(&self, user: UserId) {
        if let Err(e) = self.registry.store().delete_queue_entry(user).await {
            tracing::warn!(user_id = %user, error = %e, "failed to delete queue entry");
        }
    }
}
