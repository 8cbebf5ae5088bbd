//! Reload server traits and error types.
//!
//! The notifier talks to its reload server only through [`ReloadServer`],
//! and builds one through a [`ServerFactory`]. Swapping the factory swaps
//! the whole server implementation.

use std::future::Future;
use std::net::SocketAddr;

use refresh_config::Config;

use crate::notification::Notification;

/// Port used when the configuration does not set one.
pub const DEFAULT_PORT: u16 = 35729;

/// Host used when the configuration does not set one.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// A live-reload server.
pub trait ReloadServer: Send + Sync + 'static {
    /// Start serving.
    ///
    /// Resolves once the listener is bound, with the bound address.
    /// `None` values fall back to [`DEFAULT_PORT`] and [`DEFAULT_HOST`].
    fn listen(
        &self,
        port: Option<u16>,
        host: Option<&str>,
    ) -> impl Future<Output = Result<SocketAddr, ServerError>> + Send;

    /// Push a change notification to connected clients.
    fn changed(&self, notification: &Notification);
}

/// Builds reload servers from a configuration record.
pub trait ServerFactory: Send + Sync + 'static {
    /// Server type produced by this factory.
    type Server: ReloadServer;

    /// Construct a server from the full configuration.
    fn create(&self, config: &Config) -> Result<Self::Server, ServerError>;
}

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Listener could not be bound.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Requested `host:port`.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Server could not be constructed.
    #[error("Failed to create reload server: {0}")]
    Create(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
