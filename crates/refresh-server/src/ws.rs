//! WebSocket reload server.
//!
//! Fans change notifications out to connected browsers through a broadcast
//! channel. Each changed file becomes one [`ReloadEvent`].

use std::net::SocketAddr;

use refresh_config::Config;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::middleware::middleware;
use crate::notification::{Notification, ReloadEvent};
use crate::server::{DEFAULT_HOST, DEFAULT_PORT, ReloadServer, ServerError, ServerFactory};

/// Capacity of the reload event channel.
const CHANNEL_CAPACITY: usize = 100;

/// Broadcast side shared by the server and its routes.
#[derive(Clone, Debug)]
pub(crate) struct Hub {
    broadcaster: broadcast::Sender<ReloadEvent>,
    quiet: bool,
}

impl Hub {
    fn new(quiet: bool) -> Self {
        let (broadcaster, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self { broadcaster, quiet }
    }

    /// Send one reload event per changed file.
    pub(crate) fn broadcast(&self, notification: &Notification) {
        for file in notification.files() {
            // No subscribers is not an error
            let _ = self.broadcaster.send(ReloadEvent::reload(file.as_str()));
        }

        if self.quiet {
            tracing::debug!(files = ?notification.files(), "Broadcast reload");
        } else {
            tracing::info!(
                files = ?notification.files(),
                clients = self.clients(),
                "Broadcast reload"
            );
        }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.broadcaster.subscribe()
    }

    pub(crate) fn clients(&self) -> usize {
        self.broadcaster.receiver_count()
    }
}

/// Live-reload server backed by axum WebSockets.
///
/// Browsers connect to `/livereload` and receive `{"type":"reload","path":...}`
/// messages. Build pipelines outside the process can `POST /changed` with
/// `{"files": [...]}`.
#[derive(Debug)]
pub struct WsServer {
    hub: Hub,
}

impl WsServer {
    /// Create a server from the notifier configuration.
    ///
    /// Only `quiet` is read here; port and host are passed to
    /// [`ReloadServer::listen`].
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            hub: Hub::new(config.quiet),
        }
    }

    /// Get a receiver for reload events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.hub.subscribe()
    }

    /// Number of connected clients.
    pub fn clients(&self) -> usize {
        self.hub.clients()
    }

    pub(crate) fn hub(&self) -> Hub {
        self.hub.clone()
    }
}

impl ReloadServer for WsServer {
    async fn listen(
        &self,
        port: Option<u16>,
        host: Option<&str>,
    ) -> Result<SocketAddr, ServerError> {
        let port = port.unwrap_or(DEFAULT_PORT);
        let host = host.unwrap_or(DEFAULT_HOST);

        let listener = TcpListener::bind((host, port))
            .await
            .map_err(|source| ServerError::Bind {
                addr: format!("{host}:{port}"),
                source,
            })?;
        let addr = listener.local_addr()?;

        let app = middleware(self).layer(TraceLayer::new_for_http());
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Live reload server stopped");
            }
        });

        tracing::info!(address = %addr, "Live reload server listening");
        Ok(addr)
    }

    fn changed(&self, notification: &Notification) {
        self.hub.broadcast(notification);
    }
}

/// Factory for [`WsServer`].
#[derive(Clone, Copy, Debug, Default)]
pub struct WsServerFactory;

impl ServerFactory for WsServerFactory {
    type Server = WsServer;

    fn create(&self, config: &Config) -> Result<WsServer, ServerError> {
        Ok(WsServer::new(config))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures_util::StreamExt;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_changed_broadcasts_each_file() {
        let server = WsServer::new(&Config::default());
        let mut rx = server.subscribe();

        server.changed(&Notification {
            body: crate::NotificationBody {
                files: vec!["/a.css".to_owned(), "/b.js".to_owned()],
            },
        });

        assert_eq!(rx.try_recv().unwrap().path(), "/a.css");
        assert_eq!(rx.try_recv().unwrap().path(), "/b.js");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_changed_without_clients() {
        let server = WsServer::new(&Config::default());
        assert_eq!(server.clients(), 0);
        server.changed(&Notification::single("/a.css"));
    }

    #[tokio::test]
    async fn test_listen_on_ephemeral_port() {
        let server = WsServer::new(&Config::default());
        let addr = server.listen(Some(0), Some("127.0.0.1")).await.unwrap();

        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn test_listen_port_in_use() {
        let first = WsServer::new(&Config::default());
        let addr = first.listen(Some(0), Some("127.0.0.1")).await.unwrap();

        let second = WsServer::new(&Config::default());
        let result = second.listen(Some(addr.port()), Some("127.0.0.1")).await;

        assert!(matches!(result, Err(ServerError::Bind { .. })));
    }

    #[tokio::test]
    async fn test_websocket_client_receives_reload() {
        let server = WsServer::new(&Config::default());
        let addr = server.listen(Some(0), Some("127.0.0.1")).await.unwrap();

        let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/livereload"))
            .await
            .unwrap();

        // The subscription is registered after the upgrade completes
        for _ in 0..200 {
            if server.clients() > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(server.clients(), 1);

        server.changed(&Notification::single("/css/a.css"));

        let message = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(message.to_text().unwrap()).unwrap();

        assert_eq!(json["type"], "reload");
        assert_eq!(json["path"], "/css/a.css");
    }
}
