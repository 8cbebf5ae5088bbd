//! Reload server seam for the refresh notifier.
//!
//! The notifier never speaks to browsers itself. It hands
//! [`Notification`]s to a [`ReloadServer`], which it builds through a
//! [`ServerFactory`] the first time it is asked to listen.
//!
//! # Implementations
//!
//! - [`WsServer`]: axum server pushing JSON reload events over WebSockets
//! - [`MockServer`]: records calls for tests (behind `mock` feature flag)
//!
//! # Embedding
//!
//! [`middleware`] returns the routes of a [`WsServer`] as an axum
//! [`Router`](axum::Router), for merging into an existing application:
//!
//! ```ignore
//! use refresh_config::Config;
//! use refresh_server::{WsServer, middleware};
//!
//! let server = WsServer::new(&Config::default());
//! let app = axum::Router::new().merge(middleware(&server));
//! ```
//!
//! # Routes
//!
//! ```text
//! GET  /livereload   WebSocket, receives {"type":"reload","path":"/css/a.css"}
//! POST /changed      {"files": ["/css/a.css"]} -> broadcast to all clients
//! ```

mod middleware;
#[cfg(feature = "mock")]
mod mock;
mod notification;
mod server;
mod websocket;
mod ws;

pub use middleware::{CHANGED_PATH, LIVERELOAD_PATH, middleware};
#[cfg(feature = "mock")]
pub use mock::{ListenCall, MockServer, MockServerFactory};
pub use notification::{Notification, NotificationBody, ReloadEvent};
pub use server::{DEFAULT_HOST, DEFAULT_PORT, ReloadServer, ServerError, ServerFactory};
pub use ws::{WsServer, WsServerFactory};
