//! Notifier error types.

use refresh_server::ServerError;

/// Notifier error type.
///
/// Only starting a server can fail. Notifying never does.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The reload server could not be created or bound.
    #[error("{0}")]
    Server(#[from] ServerError),
}
