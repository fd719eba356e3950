//! Identity hook for authenticating connections.
//!
//! Rookery does not manage accounts. The server hands whatever token a
//! client presents in its handshake to an [`Authenticator`] and binds the
//! returned [`Identity`] to the connection. Events that arrive before that
//! are refused.

use rookery_protocol::{Identity, UserId};

use crate::SessionError;

const MAX_USERNAME_LEN: usize = 32;

/// Resolves a client's token to an identity.
///
/// # Example
///
/// ```rust
/// use rookery_protocol::{Identity, UserId};
/// use rookery_session::{Authenticator, SessionError};
///
/// /// Lets in exactly one hard-coded user.
/// struct SingleUser;
///
/// impl Authenticator for SingleUser {
///     async fn authenticate(&self, token: &str) -> Result<Identity, SessionError> {
///         if token == "let-me-in" {
///             Ok(Identity::new(UserId(1), "admin"))
///         } else {
///             Err(SessionError::AuthFailed("unknown token".into()))
///         }
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// Validates `token`.
    ///
    /// # Errors
    /// [`SessionError::AuthFailed`] if the token is not accepted.
    fn authenticate(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<Identity, SessionError>> + Send;
}

/// Trusts the token outright. For development and tests only.
///
/// Tokens look like `"<id>:<name>"` (`"42:alice"`). A bare `"<id>"` gets
/// the name `player-<id>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DevAuthenticator;

impl Authenticator for DevAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<Identity, SessionError> {
        let (raw_id, name) = match token.split_once(':') {
            Some((id, name)) => (id, Some(name.trim())),
            None => (token, None),
        };
        let id: u64 = raw_id
            .trim()
            .parse()
            .map_err(|_| SessionError::AuthFailed("token must start with a numeric user id".into()))?;

        let username = match name {
            Some("") => return Err(SessionError::AuthFailed("empty username".into())),
            Some(name) if name.chars().count() > MAX_USERNAME_LEN => {
                return Err(SessionError::AuthFailed("username too long".into()));
            }
            Some(name) => name.to_string(),
            None => format!("player-{id}"),
        };
        Ok(Identity::new(UserId(id), username))
    }
}
