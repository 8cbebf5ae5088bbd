//! Notify a live-reload server that files changed.
//!
//! [`LiveReload`] is a thin facade over a reload server. It keeps one
//! configuration record, starts at most one server on demand, rewrites file
//! paths relative to a base path, and tells the server what changed.
//!
//! # Quick Start
//!
//! ```ignore
//! use refresh::{Config, ConfigPatch, LiveReload};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), refresh::Error> {
//!     let livereload = LiveReload::new(Config::default());
//!     livereload
//!         .listen_with(ConfigPatch::new().with_port(35729).with_base_path("dist"))
//!         .await?;
//!
//!     // Single asset
//!     livereload.changed("dist/css/app.css");
//!     // Whole page
//!     livereload.reload();
//!     Ok(())
//! }
//! ```
//!
//! # Pipelines
//!
//! [`LiveReload::stage`] returns a [`Stage`] that reports each item flowing
//! through a stream or iterator and forwards it unchanged:
//!
//! ```ignore
//! let stage = livereload.stage(ConfigPatch::new().with_start(true)).await?;
//! let built = stage.pipe(build_outputs).collect::<Vec<_>>().await;
//! ```
//!
//! # State
//!
//! ```text
//! Uninitialized ──listen──► Running(server)
//!                              │
//!                              └─ listen again: no-op
//! ```

mod error;
mod facade;
mod paths;
mod reporter;
mod stage;

pub use error::Error;
pub use facade::{Listen, LiveReload};
pub use refresh_config::{Config, ConfigError, ConfigPatch, DEFAULT_RELOAD_PAGE};
pub use refresh_server::{
    Notification, ReloadServer, ServerError, ServerFactory, WsServer, WsServerFactory, middleware,
};
pub use reporter::{ConsoleReporter, Reporter};
pub use stage::{ChangedFile, HasPath, Stage};
