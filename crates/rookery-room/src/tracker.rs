//! Connection tracker: which connection listens to which session, and how
//! to reach it.
//!
//! Each connection registers an unbounded outbound channel. The server's
//! per-connection task drains that channel onto the socket, so anything
//! here can push a message to a client without touching I/O.
//!
//! The tracker holds no game state. Its lock is a leaf: nothing is awaited
//! while it is held.

use std::collections::{HashMap, HashSet};

use rookery_protocol::{ServerMessage, SessionId, UserId};
use rookery_transport::ConnectionId;
use tokio::sync::{Mutex, mpsc};

/// Outbound channel to one connection.
pub type ClientSender = mpsc::UnboundedSender<ServerMessage>;

#[derive(Debug)]
struct Binding {
    sender: ClientSender,
    sessions: HashSet<SessionId>,
    /// Set while this connection's user waits in the matchmaking pool.
    queued: Option<UserId>,
}

#[derive(Debug, Default)]
struct Bindings {
    connections: HashMap<ConnectionId, Binding>,
    /// Session → member connections. A set is removed once it is empty.
    members: HashMap<SessionId, HashSet<ConnectionId>>,
}

impl Bindings {
    /// Removes `conn` from `session`'s member set. Returns `true` if that
    /// emptied the set.
    fn drop_member(&mut self, conn: ConnectionId, session: &SessionId) -> bool {
        let Some(set) = self.members.get_mut(session) else {
            return false;
        };
        if !set.remove(&conn) {
            return false;
        }
        if set.is_empty() {
            self.members.remove(session);
            return true;
        }
        false
    }

    fn unbind(&mut self, conn: ConnectionId) -> Departure {
        let Some(binding) = self.connections.get_mut(&conn) else {
            return Departure::default();
        };
        let sessions: Vec<SessionId> = binding.sessions.drain().collect();
        let queued = binding.queued.take();

        let emptied = sessions
            .into_iter()
            .filter(|session| self.drop_member(conn, session))
            .collect();
        Departure { emptied, queued }
    }
}

/// What a connection left behind when it was unbound.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Departure {
    /// Sessions whose last member this connection was.
    pub emptied: Vec<SessionId>,
    /// The user the connection had queued, if any.
    pub queued: Option<UserId>,
}

/// Maps connections to the sessions and queue slot they are bound to.
#[derive(Debug, Default)]
pub struct ConnectionTracker {
    inner: Mutex<Bindings>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking a connection and its outbound channel.
    pub async fn register(&self, conn: ConnectionId, sender: ClientSender) {
        let mut inner = self.inner.lock().await;
        inner.connections.insert(
            conn,
            Binding {
                sender,
                sessions: HashSet::new(),
                queued: None,
            },
        );
        tracing::debug!(%conn, "connection registered");
    }

    /// Adds `conn` to `session`'s members.
    ///
    /// Whether the connection's user may see the session is decided by the
    /// caller. Returns `false` if the connection is not registered.
    pub async fn bind_to_session(&self, conn: ConnectionId, session: &SessionId) -> bool {
        let mut inner = self.inner.lock().await;
        let Some(binding) = inner.connections.get_mut(&conn) else {
            return false;
        };
        binding.sessions.insert(session.clone());
        inner
            .members
            .entry(session.clone())
            .or_default()
            .insert(conn);
        true
    }

    /// Marks `conn` as the connection `user` queued from.
    pub async fn bind_to_queue(&self, conn: ConnectionId, user: UserId) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.connections.get_mut(&conn) {
            Some(binding) => {
                binding.queued = Some(user);
                true
            }
            None => false,
        }
    }

    /// Clears `conn`'s queue flag. Returns the user it was queued as.
    pub async fn unbind_queue(&self, conn: ConnectionId) -> Option<UserId> {
        let mut inner = self.inner.lock().await;
        inner
            .connections
            .get_mut(&conn)
            .and_then(|binding| binding.queued.take())
    }

    /// The user `conn` is queued as, if any.
    pub async fn queued_user(&self, conn: ConnectionId) -> Option<UserId> {
        let inner = self.inner.lock().await;
        inner.connections.get(&conn).and_then(|b| b.queued)
    }

    /// Removes `conn` from one session. Returns `true` if that left the
    /// session without members.
    pub async fn leave(&self, conn: ConnectionId, session: &SessionId) -> bool {
        let mut inner = self.inner.lock().await;
        if let Some(binding) = inner.connections.get_mut(&conn) {
            binding.sessions.remove(session);
        }
        inner.drop_member(conn, session)
    }

    /// Removes `conn` from every session and from the queue, but keeps its
    /// outbound channel.
    pub async fn unbind(&self, conn: ConnectionId) -> Departure {
        self.inner.lock().await.unbind(conn)
    }

    /// Unbinds `conn` and forgets it entirely.
    pub async fn disconnect(&self, conn: ConnectionId) -> Departure {
        let mut inner = self.inner.lock().await;
        let departure = inner.unbind(conn);
        inner.connections.remove(&conn);
        tracing::debug!(%conn, emptied = departure.emptied.len(), "connection removed");
        departure
    }

    /// Connections currently bound to `session`.
    pub async fn members_of(&self, session: &SessionId) -> HashSet<ConnectionId> {
        let inner = self.inner.lock().await;
        inner.members.get(session).cloned().unwrap_or_default()
    }

    pub async fn is_member(&self, conn: ConnectionId, session: &SessionId) -> bool {
        let inner = self.inner.lock().await;
        inner
            .members
            .get(session)
            .is_some_and(|set| set.contains(&conn))
    }

    /// `true` if no connection is bound to `session`.
    pub async fn has_no_members(&self, session: &SessionId) -> bool {
        !self.inner.lock().await.members.contains_key(session)
    }

    /// Sends `msg` to every member of `session`. Returns how many
    /// connections it was queued for.
    pub async fn broadcast(&self, session: &SessionId, msg: &ServerMessage) -> usize {
        self.fan_out(session, None, msg).await
    }

    /// Like [`broadcast`](Self::broadcast), skipping `except`.
    pub async fn broadcast_except(
        &self,
        session: &SessionId,
        except: ConnectionId,
        msg: &ServerMessage,
    ) -> usize {
        self.fan_out(session, Some(except), msg).await
    }

    /// Sends `msg` to one connection. Returns `false` if it is gone.
    pub async fn send_to(&self, conn: ConnectionId, msg: ServerMessage) -> bool {
        let inner = self.inner.lock().await;
        match inner.connections.get(&conn) {
            Some(binding) => binding.sender.send(msg).is_ok(),
            None => false,
        }
    }

    /// Number of registered connections.
    pub async fn connection_count(&self) -> usize {
        self.inner.lock().await.connections.len()
    }

    async fn fan_out(
        &self,
        session: &SessionId,
        except: Option<ConnectionId>,
        msg: &ServerMessage,
    ) -> usize {
        let inner = self.inner.lock().await;
        let Some(members) = inner.members.get(session) else {
            return 0;
        };
        let mut delivered = 0;
        for conn in members {
            if Some(*conn) == except {
                continue;
            }
            // A closed channel means the connection task is already
            // tearing down; its disconnect will unbind it.
            if let Some(binding) = inner.connections.get(conn) {
                if binding.sender.send(msg.clone()).is_ok() {
                    delivered += 1;
                }
            }
        }
        delivered
    }
}
