//! The notifier facade.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use refresh_config::{Config, ConfigPatch};
use refresh_server::{Notification, ReloadServer, ServerFactory, WsServerFactory};

use crate::error::Error;
use crate::paths;
use crate::reporter::{ConsoleReporter, Reporter};
use crate::stage::{HasPath, Stage};

/// Lifecycle of the reload server.
///
/// There is no stopped state: once running, the server lives as long as
/// the last clone of the facade.
enum ServerState<S> {
    Uninitialized,
    Running(Arc<S>),
}

/// Outcome of a listen call.
#[derive(Debug)]
pub enum Listen<S> {
    /// This call created the server and it is now bound.
    Started {
        /// The new server.
        server: Arc<S>,
        /// Bound address.
        addr: SocketAddr,
    },
    /// A server already existed; the call changed nothing.
    AlreadyRunning,
}

/// Live-reload notifier.
///
/// Owns a configuration record and at most one reload server. Clones share
/// both, so a [`Stage`] and the code that created it see the same state.
///
/// # Example
///
/// ```ignore
/// use refresh::{ConfigPatch, LiveReload};
///
/// let livereload = LiveReload::default();
/// livereload.configure(ConfigPatch::new().with_base_path("dist"));
/// livereload.listen_on_port(35729).await?;
///
/// livereload.changed("dist/css/app.css"); // reports "/css/app.css"
/// livereload.reload();                    // reports "/index.html"
/// ```
pub struct LiveReload<F: ServerFactory = WsServerFactory> {
    inner: Arc<Inner<F>>,
}

struct Inner<F: ServerFactory> {
    factory: F,
    reporter: Box<dyn Reporter>,
    config: Mutex<Config>,
    state: Mutex<ServerState<F::Server>>,
}

impl<F: ServerFactory> Clone for LiveReload<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl LiveReload {
    /// Create a notifier backed by the WebSocket reload server.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self::with_factory(config, WsServerFactory)
    }

    /// Routes of the running server, for embedding into an axum app.
    ///
    /// `None` until the server has been started.
    pub fn middleware(&self) -> Option<axum::Router> {
        self.server()
            .map(|server| refresh_server::middleware(&server))
    }
}

impl Default for LiveReload {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl<F: ServerFactory> LiveReload<F> {
    /// Create a notifier that builds its server with `factory`.
    #[must_use]
    pub fn with_factory(config: Config, factory: F) -> Self {
        Self::with_reporter(config, factory, ConsoleReporter::new())
    }

    /// Create a notifier with a custom reporter for "Reloaded" lines.
    #[must_use]
    pub fn with_reporter(config: Config, factory: F, reporter: impl Reporter + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                factory,
                reporter: Box::new(reporter),
                config: Mutex::new(config),
                state: Mutex::new(ServerState::Uninitialized),
            }),
        }
    }

    /// The server factory.
    pub fn factory(&self) -> &F {
        &self.inner.factory
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> Config {
        self.inner.lock_config().clone()
    }

    /// Merge `patch` into the configuration.
    pub fn configure(&self, patch: ConfigPatch) {
        self.inner.lock_config().merge(patch);
    }

    /// The running server, if any.
    pub fn server(&self) -> Option<Arc<F::Server>> {
        match &*self.inner.lock_state() {
            ServerState::Running(server) => Some(Arc::clone(server)),
            ServerState::Uninitialized => None,
        }
    }

    /// True once a server has been created.
    pub fn is_running(&self) -> bool {
        matches!(*self.inner.lock_state(), ServerState::Running(_))
    }

    /// Start the server with the current configuration.
    pub async fn listen(&self) -> Result<Listen<F::Server>, Error> {
        self.listen_with(ConfigPatch::new()).await
    }

    /// Start the server on `port`.
    pub async fn listen_on_port(&self, port: u16) -> Result<Listen<F::Server>, Error> {
        self.listen_with(ConfigPatch::new().with_port(port)).await
    }

    /// Merge `patch` and start the server.
    ///
    /// Does nothing, not even the merge, if a server already exists.
    /// Otherwise the server is built from the full merged configuration and
    /// the returned future resolves once it is bound.
    ///
    /// If binding fails the server is dropped, so a later call can retry.
    pub async fn listen_with(&self, patch: ConfigPatch) -> Result<Listen<F::Server>, Error> {
        let (server, config) = {
            let mut state = self.inner.lock_state();
            if let ServerState::Running(_) = *state {
                tracing::debug!("reload server already running, listen ignored");
                return Ok(Listen::AlreadyRunning);
            }

            let config = {
                let mut config = self.inner.lock_config();
                config.merge(patch);
                config.clone()
            };

            let server = Arc::new(self.inner.factory.create(&config)?);
            *state = ServerState::Running(Arc::clone(&server));
            (server, config)
        };

        match server.listen(config.port, config.host.as_deref()).await {
            Ok(addr) => {
                tracing::debug!(port = addr.port(), "now listening on port {}", addr.port());
                Ok(Listen::Started { server, addr })
            }
            Err(err) => {
                self.release(&server);
                Err(err.into())
            }
        }
    }

    /// Report a changed file to the server.
    ///
    /// Without a running server this only logs at debug level. With a base
    /// path configured, the path is reported relative to it (`/css/a.css`).
    pub fn changed(&self, path: impl AsRef<Path>) {
        let Some(server) = self.server() else {
            tracing::debug!("no server listening, nothing notified");
            return;
        };

        let (reported, quiet) = {
            let config = self.inner.lock_config();
            (
                paths::report_path(config.base_path.as_deref(), path.as_ref()),
                config.quiet,
            )
        };

        tracing::debug!(path = %reported, "notifying reload server");
        server.changed(&Notification::single(reported.as_str()));

        if !quiet {
            self.inner.reporter.reloaded(&paths::file_name(&reported));
        }
    }

    /// Report a changed file given as a record with a path.
    pub fn changed_file<T: HasPath + ?Sized>(&self, file: &T) {
        self.changed(file.path());
    }

    /// Full-page reload of the configured `reload_page`.
    pub fn reload(&self) {
        let page = self.inner.lock_config().reload_page.clone();
        self.changed(page);
    }

    /// Full-page reload of `path`.
    ///
    /// An empty path reloads the configured `reload_page` instead.
    pub fn reload_path(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            self.reload();
        } else {
            self.changed(path);
        }
    }

    /// Create a pipeline stage.
    ///
    /// `patch` is merged first. If the merged configuration has
    /// `start = true`, the server is started before the stage is returned;
    /// an existing server is left alone.
    pub async fn stage(&self, patch: ConfigPatch) -> Result<Stage<F>, Error> {
        self.configure(patch);

        if self.config().auto_start() {
            self.listen().await?;
        }

        Ok(Stage::new(self.clone()))
    }

    /// Drop `server` if it is still the current one.
    fn release(&self, server: &Arc<F::Server>) {
        let mut state = self.inner.lock_state();
        if matches!(&*state, ServerState::Running(current) if Arc::ptr_eq(current, server)) {
            *state = ServerState::Uninitialized;
        }
    }
}

impl<F: ServerFactory> Inner<F> {
    fn lock_config(&self) -> MutexGuard<'_, Config> {
        self.config.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_state(&self) -> MutexGuard<'_, ServerState<F::Server>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;
    use refresh_server::{ListenCall, MockServerFactory};

    use super::*;
    use crate::stage::ChangedFile;

    #[derive(Clone, Default)]
    struct RecordingReporter {
        lines: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingReporter {
        fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }
    }

    impl Reporter for RecordingReporter {
        fn reloaded(&self, file_name: &str) {
            self.lines.lock().unwrap().push(file_name.to_owned());
        }
    }

    fn notifier_with(
        config: Config,
        factory: MockServerFactory,
    ) -> (LiveReload<MockServerFactory>, RecordingReporter) {
        let reporter = RecordingReporter::default();
        let livereload = LiveReload::with_reporter(config, factory, reporter.clone());
        (livereload, reporter)
    }

    fn notifier(config: Config) -> (LiveReload<MockServerFactory>, RecordingReporter) {
        notifier_with(config, MockServerFactory::new())
    }

    #[test]
    fn test_changed_before_listen_is_noop() {
        let (livereload, reporter) = notifier(Config::default());

        livereload.changed("/project/css/a.css");
        livereload.reload();

        assert!(livereload.server().is_none());
        assert!(!livereload.is_running());
        assert_eq!(livereload.factory().created(), 0);
        assert!(reporter.lines().is_empty());
    }

    #[test]
    fn test_configure_merges() {
        let (livereload, _) = notifier(Config::default());

        livereload.configure(ConfigPatch::new().with_port(1234).with_host("0.0.0.0"));
        livereload.configure(ConfigPatch::new().with_quiet(true));

        let config = livereload.config();
        assert_eq!(config.port, Some(1234));
        assert_eq!(config.host.as_deref(), Some("0.0.0.0"));
        assert!(config.quiet);
        assert_eq!(config.reload_page, "index.html");
    }

    #[tokio::test]
    async fn test_listen_starts_once() {
        let (livereload, _) = notifier(Config::default());

        let first = livereload.listen_on_port(1111).await.unwrap();
        let second = livereload.listen_on_port(2222).await.unwrap();

        let Listen::Started { server, addr } = first else {
            panic!("first listen should start the server");
        };
        assert_eq!(addr.port(), 1111);
        assert!(matches!(second, Listen::AlreadyRunning));
        assert_eq!(livereload.factory().created(), 1);
        assert_eq!(livereload.config().port, Some(1111));
        assert!(Arc::ptr_eq(&server, &livereload.server().unwrap()));
        assert_eq!(server.listens().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_listens_start_one_server() {
        let (livereload, _) = notifier(Config::default());

        let (first, second) = tokio::join!(
            livereload.listen_on_port(1111),
            livereload.listen_on_port(2222),
        );

        let results = [first.unwrap(), second.unwrap()];
        let started = results
            .iter()
            .filter(|listen| matches!(listen, Listen::Started { .. }))
            .count();
        assert_eq!(started, 1);
        assert_eq!(livereload.factory().created(), 1);
        assert_eq!(livereload.server().unwrap().listens().len(), 1);
    }

    #[tokio::test]
    async fn test_listen_uses_full_merged_config() {
        let (livereload, _) = notifier(Config::default());
        livereload.configure(
            ConfigPatch::new()
                .with_host("localhost")
                .with_base_path("/project"),
        );

        livereload
            .listen_with(ConfigPatch::new().with_port(4000).with_quiet(true))
            .await
            .unwrap();

        let server = livereload.server().unwrap();
        assert_eq!(server.config().base_path, Some(PathBuf::from("/project")));
        assert!(server.config().quiet);
        assert_eq!(
            server.listens(),
            vec![ListenCall {
                port: Some(4000),
                host: Some("localhost".to_owned()),
            }]
        );
    }

    #[tokio::test]
    async fn test_listen_without_port_passes_none() {
        let (livereload, _) = notifier(Config::default());

        livereload.listen().await.unwrap();

        let server = livereload.server().unwrap();
        assert_eq!(
            server.listens(),
            vec![ListenCall {
                port: None,
                host: None,
            }]
        );
    }

    #[tokio::test]
    async fn test_listen_create_failure() {
        let (livereload, _) = notifier_with(
            Config::default(),
            MockServerFactory::new().with_failing_create(),
        );

        let result = livereload.listen().await;

        assert!(matches!(result, Err(Error::Server(_))));
        assert!(livereload.server().is_none());
    }

    #[tokio::test]
    async fn test_listen_bind_failure_releases_server() {
        let (livereload, reporter) = notifier_with(
            Config::default(),
            MockServerFactory::new().with_failing_bind(),
        );

        let result = livereload.listen_on_port(80).await;
        assert!(matches!(result, Err(Error::Server(_))));
        assert!(livereload.server().is_none());

        livereload.changed("/a.css");
        assert!(reporter.lines().is_empty());

        let retry = livereload.listen().await;
        assert!(retry.is_err());
        assert_eq!(livereload.factory().created(), 2);
    }

    #[tokio::test]
    async fn test_changed_rewrites_relative_to_base_path() {
        let (livereload, _) =
            notifier(Config::default().merged(ConfigPatch::new().with_base_path("/project")));
        livereload.listen().await.unwrap();

        livereload.changed("/project/css/a.css");

        let server = livereload.server().unwrap();
        assert_eq!(
            server.notifications(),
            vec![Notification::single("/css/a.css")]
        );
    }

    #[tokio::test]
    async fn test_changed_without_base_path_is_unchanged() {
        let (livereload, _) = notifier(Config::default());
        livereload.listen().await.unwrap();

        livereload.changed("/project/css/a.css");

        assert_eq!(
            livereload.server().unwrap().changed_files(),
            vec!["/project/css/a.css".to_owned()]
        );
    }

    #[tokio::test]
    async fn test_changed_with_empty_base_path_is_unchanged() {
        let (livereload, _) = notifier(Config::default());
        livereload.configure(ConfigPatch::new().with_base_path(""));
        livereload.listen().await.unwrap();

        livereload.changed("/project/css/a.css");

        assert_eq!(
            livereload.server().unwrap().changed_files(),
            vec!["/project/css/a.css".to_owned()]
        );
    }

    #[tokio::test]
    async fn test_changed_file_uses_record_path() {
        let (livereload, _) =
            notifier(Config::default().merged(ConfigPatch::new().with_base_path("/site")));
        livereload.listen().await.unwrap();

        let file = ChangedFile::new("/site/js/app.js");
        livereload.changed_file(&file);

        assert_eq!(
            livereload.server().unwrap().changed_files(),
            vec!["/js/app.js".to_owned()]
        );
    }

    #[tokio::test]
    async fn test_reload_defaults_to_reload_page() {
        let (livereload, _) = notifier(Config::default());
        livereload.listen().await.unwrap();

        livereload.reload();
        livereload.reload_path("other.html");

        assert_eq!(
            livereload.server().unwrap().changed_files(),
            vec!["index.html".to_owned(), "other.html".to_owned()]
        );
    }

    #[tokio::test]
    async fn test_reload_path_empty_falls_back_to_reload_page() {
        let (livereload, _) = notifier(Config::default());
        livereload.listen().await.unwrap();

        livereload.reload_path("");

        assert_eq!(
            livereload.server().unwrap().changed_files(),
            vec!["index.html".to_owned()]
        );
    }

    #[tokio::test]
    async fn test_reload_uses_configured_page() {
        let (livereload, _) = notifier(Config::default());
        livereload.configure(ConfigPatch::new().with_reload_page("home.html"));
        livereload.listen().await.unwrap();

        livereload.reload();

        assert_eq!(
            livereload.server().unwrap().changed_files(),
            vec!["home.html".to_owned()]
        );
    }

    #[tokio::test]
    async fn test_reporter_names_base_name() {
        let (livereload, reporter) =
            notifier(Config::default().merged(ConfigPatch::new().with_base_path("/project")));
        livereload.listen().await.unwrap();

        livereload.changed("/project/css/a.css");

        assert_eq!(reporter.lines(), vec!["a.css".to_owned()]);
    }

    #[tokio::test]
    async fn test_quiet_suppresses_reporter() {
        let (livereload, reporter) =
            notifier(Config::default().merged(ConfigPatch::new().with_quiet(true)));
        livereload.listen().await.unwrap();

        livereload.changed("/project/css/a.css");

        assert!(reporter.lines().is_empty());
        assert_eq!(livereload.server().unwrap().notifications().len(), 1);
    }

    #[tokio::test]
    async fn test_clones_share_server_and_config() {
        let (livereload, _) = notifier(Config::default());
        let other = livereload.clone();

        other.configure(ConfigPatch::new().with_base_path("/project"));
        livereload.listen().await.unwrap();
        other.changed("/project/a.css");

        assert!(other.is_running());
        assert_eq!(
            livereload.server().unwrap().changed_files(),
            vec!["/a.css".to_owned()]
        );
    }

    #[tokio::test]
    async fn test_middleware_available_after_listen() {
        let livereload =
            LiveReload::new(Config::default().merged(ConfigPatch::new().with_quiet(true)));
        assert!(livereload.middleware().is_none());

        livereload
            .listen_with(ConfigPatch::new().with_port(0).with_host("127.0.0.1"))
            .await
            .unwrap();

        assert!(livereload.middleware().is_some());
    }
}
