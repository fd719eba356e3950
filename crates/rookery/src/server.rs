//! `RookeryServer` builder and accept loop.
//!
//! This is the entry point for running a Rookery server. It ties the
//! layers together: transport → protocol → lobby → session + store.

use std::sync::Arc;

use rookery_protocol::{Codec, JsonCodec};
use rookery_room::Lobby;
use rookery_rules::RulesEngine;
use rookery_session::Authenticator;
use rookery_store::SessionStore;
use rookery_transport::{Transport, WebSocketTransport};

use crate::RookeryError;
use crate::config::ServerConfig;
use crate::handler::handle_connection;

/// Shared server state passed to each connection task.
pub(crate) struct ServerState<R: RulesEngine, S: SessionStore, A: Authenticator, C: Codec> {
    pub(crate) lobby: Lobby<R, S>,
    pub(crate) auth: A,
    pub(crate) codec: C,
    pub(crate) config: ServerConfig,
}

/// Builder for configuring and starting a Rookery server.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use rookery::prelude::*;
///
/// # async fn start() -> Result<(), RookeryError> {
/// let store = Arc::new(JsonFileStore::open("./data").await?);
/// let server = RookeryServerBuilder::new()
///     .bind("0.0.0.0:8080")
///     .build(StandardChess, store, DevAuthenticator)
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct RookeryServerBuilder {
    config: ServerConfig,
}

impl RookeryServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Binds the listener and clears queue entries left by a previous run.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build<R, S, A>(
        self,
        rules: R,
        store: Arc<S>,
        auth: A,
    ) -> Result<RookeryServer<R, S, A, JsonCodec>, RookeryError>
    where
        R: RulesEngine,
        S: SessionStore,
        A: Authenticator,
    {
        let lobby = Lobby::new(Arc::new(rules), store);
        lobby.reset_queue().await?;

        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let state = Arc::new(ServerState {
            lobby,
            auth,
            codec: JsonCodec,
            config: self.config,
        });

        Ok(RookeryServer { transport, state })
    }
}

impl Default for RookeryServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Rookery server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct RookeryServer<R: RulesEngine, S: SessionStore, A: Authenticator, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<R, S, A, C>>,
}

impl<R, S, A, C> RookeryServer<R, S, A, C>
where
    R: RulesEngine,
    S: SessionStore,
    A: Authenticator,
    C: Codec,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    /// Runs the accept loop, one task per connection, until the process
    /// is terminated. A failed accept is logged and the loop carries on.
    pub async fn run(mut self) -> Result<(), RookeryError> {
        tracing::info!(addr = %self.state.config.bind_addr, "rookery server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
