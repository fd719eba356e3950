//! The session registry: one authoritative in-memory instance per session.
//!
//! # Locking
//!
//! The registry map and each session have their own `tokio` mutex. A
//! session mutex is the serialization boundary for that session: whoever
//! holds its [`SessionGuard`] is the only one reading or mutating it, and
//! may keep holding it across store writes and broadcasts.
//!
//! Locks are always taken in the order session → map, and the map lock is
//! never held while waiting for a session lock or for the store. Each id
//! maps to a [`OnceCell`] that is filled by the first caller to hydrate
//! it. Callers racing on a cold id wait on that cell and get the same
//! instance, while every other id stays reachable.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use rookery_protocol::SessionId;
use rookery_rules::RulesEngine;
use rookery_store::{SessionRecord, SessionStore};
use tokio::sync::{Mutex, OnceCell, OwnedMutexGuard};

use crate::{GameSession, SessionError};

/// A shared, lockable session.
pub type SessionSlot<P> = Arc<Mutex<GameSession<P>>>;

/// Exclusive access to one session. Dropping it releases the session.
pub type SessionGuard<P> = OwnedMutexGuard<GameSession<P>>;

/// A map entry: empty while the session is being hydrated.
type SessionCell<P> = Arc<OnceCell<SessionSlot<P>>>;

/// Owns every loaded [`GameSession`] and rebuilds unloaded ones from the
/// durable store.
pub struct SessionRegistry<R: RulesEngine, S: SessionStore> {
    rules: Arc<R>,
    store: Arc<S>,
    sessions: Mutex<HashMap<SessionId, SessionCell<R::Position>>>,
}

impl<R: RulesEngine, S: SessionStore> SessionRegistry<R, S> {
    pub fn new(rules: Arc<R>, store: Arc<S>) -> Self {
        Self {
            rules,
            store,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the loaded session with this id. Does not touch the store.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if the session is not in memory.
    pub async fn get(&self, id: &SessionId) -> Result<SessionSlot<R::Position>, SessionError> {
        self.sessions
            .lock()
            .await
            .get(id)
            .and_then(|cell| cell.get().cloned())
            .ok_or_else(|| SessionError::NotFound(id.clone()))
    }

    /// Returns the loaded session, or hydrates it from the durable record.
    ///
    /// A record whose move log does not fully replay is still loaded, at
    /// the last position that did replay, and flagged degraded. The
    /// anomaly is logged rather than returned.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`] if there is no durable record
    /// - [`SessionError::Store`] if the record could not be read
    pub async fn load_or_hydrate(
        &self,
        id: &SessionId,
    ) -> Result<SessionSlot<R::Position>, SessionError> {
        let cell = {
            let mut sessions = self.sessions.lock().await;
            Arc::clone(sessions.entry(id.clone()).or_default())
        };

        let loaded = cell
            .get_or_try_init(|| async {
                let record = self
                    .store
                    .read_session(id)
                    .await?
                    .ok_or_else(|| SessionError::NotFound(id.clone()))?;
                let session = self.hydrate(record).await;
                Ok::<_, SessionError>(Arc::new(Mutex::new(session)))
            })
            .await
            .map(Arc::clone);

        if loaded.is_err() {
            drop(cell);
            self.forget_unfilled(id).await;
        }
        loaded
    }

    /// Locks a session for exclusive use, loading it first if needed.
    ///
    /// If the session is evicted while this caller waits for the lock, the
    /// id is looked up again so the caller never works on a dropped
    /// instance.
    pub async fn acquire(&self, id: &SessionId) -> Result<SessionGuard<R::Position>, SessionError> {
        loop {
            let slot = self.load_or_hydrate(id).await?;
            let guard = slot.lock_owned().await;
            if !guard.is_evicted() {
                return Ok(guard);
            }
            tracing::debug!(session_id = %id, "session evicted while waiting, retrying");
        }
    }

    /// Adds a newly created session. Its durable record must already
    /// exist.
    pub async fn register(&self, session: GameSession<R::Position>) -> SessionSlot<R::Position> {
        let id = session.id().clone();
        let slot = Arc::new(Mutex::new(session));
        let cell = Arc::new(OnceCell::new_with(Some(Arc::clone(&slot))));
        self.sessions.lock().await.insert(id.clone(), cell);
        tracing::info!(session_id = %id, "session registered");
        slot
    }

    /// Drops a session from memory if `still_empty` confirms no connection
    /// is bound to it.
    ///
    /// `still_empty` runs while the session is locked, so no join can slip
    /// in between the check and the removal. Returns whether the session
    /// was evicted.
    pub async fn evict_if_empty<F, Fut>(&self, id: &SessionId, still_empty: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = bool>,
    {
        let slot = match self.get(id).await {
            Ok(slot) => slot,
            Err(_) => return false,
        };

        let mut session = slot.lock().await;
        if session.is_evicted() || !still_empty().await {
            return false;
        }
        session.mark_evicted();

        let mut sessions = self.sessions.lock().await;
        if sessions
            .get(id)
            .and_then(|cell| cell.get())
            .is_some_and(|current| Arc::ptr_eq(current, &slot))
        {
            sessions.remove(id);
        }
        tracing::info!(session_id = %id, "session evicted");
        true
    }

    /// Number of map entries, counting sessions still being hydrated.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    /// Whether the session is in memory and fully hydrated.
    pub async fn is_loaded(&self, id: &SessionId) -> bool {
        self.sessions
            .lock()
            .await
            .get(id)
            .is_some_and(|cell| cell.initialized())
    }

    /// Removes the entry for `id` if hydration left it empty and no other
    /// caller is still waiting on it.
    ///
    /// Callers drop their own handle on the cell first. Handles are only
    /// cloned under the map lock, so the last caller to give up sees a
    /// count of one and cleans up.
    async fn forget_unfilled(&self, id: &SessionId) {
        let mut sessions = self.sessions.lock().await;
        let unclaimed = sessions
            .get(id)
            .is_some_and(|cell| !cell.initialized() && Arc::strong_count(cell) == 1);
        if unclaimed {
            sessions.remove(id);
        }
    }

    /// Replays a durable record into a session.
    async fn hydrate(&self, record: SessionRecord) -> GameSession<R::Position> {
        let players = record.players();
        let (moves, position, degraded) = match self.rules.replay(&record.moves) {
            Ok(position) => (record.moves, position, false),
            Err(e) => {
                tracing::warn!(
                    session_id = %record.id,
                    ply = e.ply,
                    stored = record.moves.len(),
                    error = %e.source,
                    "move log failed to replay, loading last good position read-only"
                );
                let mut moves = record.moves;
                moves.truncate(e.ply);
                (moves, e.last_good, true)
            }
        };

        let mut session = GameSession::restore(
            record.id,
            players,
            moves,
            position,
            record.status,
            record.result,
            degraded,
        );

        if session.status().is_active() {
            if let Some(terminal) = self.rules.terminal_status(session.position()) {
                let result = terminal.result();
                session.finish(result);
                tracing::info!(session_id = %session.id(), %terminal, "repaired status of finished game");
                if let Err(e) = self
                    .store
                    .set_status(session.id(), session.status(), Some(result))
                    .await
                {
                    tracing::warn!(session_id = %session.id(), error = %e, "failed to persist repaired status");
                }
            }
        }

        tracing::info!(
            session_id = %session.id(),
            moves = session.moves().len(),
            status = %session.status(),
            "session hydrated"
        );
        session
    }
}
