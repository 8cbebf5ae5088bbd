//! Mock reload server for testing.
//!
//! Provides [`MockServer`] and [`MockServerFactory`] for exercising code
//! that drives a reload server without opening sockets.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use refresh_config::Config;

use crate::notification::Notification;
use crate::server::{DEFAULT_PORT, ReloadServer, ServerError, ServerFactory};

/// A recorded call to [`ReloadServer::listen`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListenCall {
    /// Requested port.
    pub port: Option<u16>,
    /// Requested host.
    pub host: Option<String>,
}

/// Mock reload server.
///
/// Records every listen call and notification. Listening always reports
/// `127.0.0.1` with the requested port (or [`DEFAULT_PORT`]).
#[derive(Debug)]
pub struct MockServer {
    config: Config,
    fail_bind: bool,
    listens: Mutex<Vec<ListenCall>>,
    notifications: Mutex<Vec<Notification>>,
}

impl MockServer {
    /// Create a mock server built from `config`.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            fail_bind: false,
            listens: Mutex::new(Vec::new()),
            notifications: Mutex::new(Vec::new()),
        }
    }

    /// Make every listen call fail with [`ServerError::Bind`].
    #[must_use]
    pub fn with_failing_bind(mut self) -> Self {
        self.fail_bind = true;
        self
    }

    /// Configuration the server was constructed from.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Listen calls received so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn listens(&self) -> Vec<ListenCall> {
        self.listens.lock().unwrap().clone()
    }

    /// Notifications received so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }

    /// Every file named by the received notifications, in order.
    pub fn changed_files(&self) -> Vec<String> {
        self.notifications()
            .into_iter()
            .flat_map(|n| n.body.files)
            .collect()
    }
}

impl ReloadServer for MockServer {
    async fn listen(
        &self,
        port: Option<u16>,
        host: Option<&str>,
    ) -> Result<SocketAddr, ServerError> {
        self.listens.lock().unwrap().push(ListenCall {
            port,
            host: host.map(str::to_owned),
        });

        if self.fail_bind {
            let port = port.unwrap_or(DEFAULT_PORT);
            return Err(ServerError::Bind {
                addr: format!("{}:{port}", host.unwrap_or("127.0.0.1")),
                source: std::io::Error::from(std::io::ErrorKind::AddrInUse),
            });
        }

        Ok(SocketAddr::from((Ipv4Addr::LOCALHOST, port.unwrap_or(DEFAULT_PORT))))
    }

    fn changed(&self, notification: &Notification) {
        self.notifications.lock().unwrap().push(notification.clone());
    }
}

/// Factory producing [`MockServer`] instances.
#[derive(Debug, Default)]
pub struct MockServerFactory {
    created: AtomicUsize,
    fail_create: bool,
    fail_bind: bool,
}

impl MockServerFactory {
    /// Create a factory whose servers always succeed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make [`ServerFactory::create`] fail.
    #[must_use]
    pub fn with_failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    /// Produce servers whose listen calls fail.
    #[must_use]
    pub fn with_failing_bind(mut self) -> Self {
        self.fail_bind = true;
        self
    }

    /// Number of servers created so far (failed attempts included).
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl ServerFactory for MockServerFactory {
    type Server = MockServer;

    fn create(&self, config: &Config) -> Result<MockServer, ServerError> {
        self.created.fetch_add(1, Ordering::SeqCst);

        if self.fail_create {
            return Err(ServerError::Create(
                "mock factory configured to fail".to_owned(),
            ));
        }

        let server = MockServer::new(config);
        Ok(if self.fail_bind {
            server.with_failing_bind()
        } else {
            server
        })
    }
}
