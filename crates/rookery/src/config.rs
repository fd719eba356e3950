//! Server configuration.
//!
//! Defaults suit local development. [`ServerConfig::from_env`] layers the
//! process environment on top:
//!
//! | Variable                    | Field               |
//! |-----------------------------|---------------------|
//! | `ROOKERY_BIND`              | `bind_addr`         |
//! | `PORT`                      | `bind_addr` (`0.0.0.0:<port>`, if `ROOKERY_BIND` is unset) |
//! | `ROOKERY_DATA_DIR`          | `data_dir`          |
//! | `ROOKERY_IDLE_TIMEOUT_SECS` | `idle_timeout`      |

use std::path::PathBuf;
use std::time::Duration;

/// Everything the server needs to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,
    /// Root directory of the file store.
    pub data_dir: PathBuf,
    /// How long a new connection has to complete its handshake.
    pub handshake_timeout: Duration,
    /// A connection that sends nothing for this long is dropped.
    pub idle_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            data_dir: PathBuf::from("./data"),
            handshake_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by whatever the environment sets.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Applies overrides from `lookup`. Values that do not parse are
    /// logged and ignored.
    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(addr) = lookup("ROOKERY_BIND") {
            self.bind_addr = addr;
        } else if let Some(port) = lookup("PORT") {
            match port.parse::<u16>() {
                Ok(port) => self.bind_addr = format!("0.0.0.0:{port}"),
                Err(_) => tracing::warn!(%port, "ignoring invalid PORT"),
            }
        }

        if let Some(dir) = lookup("ROOKERY_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }

        if let Some(secs) = lookup("ROOKERY_IDLE_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(secs) if secs > 0 => self.idle_timeout = Duration::from_secs(secs),
                _ => tracing::warn!(value = %secs, "ignoring invalid ROOKERY_IDLE_TIMEOUT_SECS"),
            }
        }
        self
    }
}
