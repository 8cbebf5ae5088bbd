//! `refresh serve` command implementation.
//!
//! Starts the reload server, then treats every line on stdin as a changed
//! path. An empty line requests a full-page reload. Pipe a file watcher in:
//!
//! ```text
//! watchexec --emit-events-to=stdio ... | refresh serve --base-path dist
//! ```

use std::path::PathBuf;

use clap::Args;
use refresh::{Config, ConfigPatch, Listen, LiveReload, Stage};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    /// Path to configuration file (default: auto-discover refresh.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory stripped from reported paths (overrides config).
    #[arg(short, long)]
    base_path: Option<PathBuf>,

    /// Page reported by a full reload (overrides config).
    #[arg(long)]
    reload_page: Option<String>,

    /// Do not print a line per reloaded file.
    #[arg(short, long)]
    quiet: bool,

    /// Enable verbose output (debug logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server fails to start.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let file_patch = ConfigPatch::load(self.config.as_deref())?;
        let patch = file_patch.overlay(self.cli_patch());

        let livereload = LiveReload::new(Config::default().merged(patch));
        if let Listen::Started { addr, .. } = livereload.listen().await? {
            output.highlight(&format!("Live reload server listening on {addr}"));
        }

        let config = livereload.config();
        if let Some(base_path) = &config.base_path {
            output.info(&format!("Base path: {}", base_path.display()));
        }
        output.info("Reading changed paths from stdin (empty line reloads the page)");

        let stage = livereload.stage(ConfigPatch::new()).await?;

        tokio::select! {
            result = read_changes(&stage) => result?,
            () = shutdown_signal() => {}
        }

        Ok(())
    }

    /// Patch holding only the values given on the command line.
    fn cli_patch(&self) -> ConfigPatch {
        ConfigPatch {
            port: self.port,
            host: self.host.clone(),
            base_path: self.base_path.clone(),
            start: None,
            quiet: self.quiet.then_some(true),
            reload_page: self.reload_page.clone(),
        }
    }
}

/// Feed stdin lines through the stage until end of input.
async fn read_changes(stage: &Stage) -> Result<(), CliError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            stage.notifier().reload();
        } else {
            stage.pass(PathBuf::from(line));
        }
    }

    tracing::debug!("stdin closed, stopping");
    Ok(())
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}
