//! Configuration for the refresh live-reload notifier.
//!
//! A [`Config`] is the full record a notifier works from. Callers never
//! replace it wholesale; they apply [`ConfigPatch`] values, which overwrite
//! the keys they carry and leave every other key untouched.
//!
//! Patches can also be read from a `refresh.toml` file:
//!
//! ```toml
//! port = 35729
//! host = "0.0.0.0"
//! base_path = "dist"
//! quiet = false
//! reload_page = "index.html"
//! ```
//!
//! ## Environment Variable Expansion
//!
//! `host` and `base_path` support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! A bare `$VAR` is kept as written.

mod expand;

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Page reported by a full reload when no path is given.
pub const DEFAULT_RELOAD_PAGE: &str = "index.html";

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "refresh.toml";

/// Notifier configuration.
///
/// Nothing here is validated. A bad host or an unusable port only shows up
/// once the reload server tries to bind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Reload server port (`None` lets the server pick its default).
    pub port: Option<u16>,
    /// Reload server bind host (`None` lets the server pick its default).
    pub host: Option<String>,
    /// Directory stripped from reported paths.
    pub base_path: Option<PathBuf>,
    /// Start the server when a pipeline stage is created.
    pub start: Option<bool>,
    /// Suppress the per-notification "Reloaded" line.
    pub quiet: bool,
    /// Target of a full-page reload.
    pub reload_page: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: None,
            host: None,
            base_path: None,
            start: None,
            quiet: false,
            reload_page: DEFAULT_RELOAD_PAGE.to_owned(),
        }
    }
}

impl Config {
    /// Shallow-merge a patch into this configuration.
    ///
    /// Keys present in `patch` overwrite; absent keys keep their value.
    pub fn merge(&mut self, patch: ConfigPatch) {
        let ConfigPatch {
            port,
            host,
            base_path,
            start,
            quiet,
            reload_page,
        } = patch;

        if port.is_some() {
            self.port = port;
        }
        if host.is_some() {
            self.host = host;
        }
        if base_path.is_some() {
            self.base_path = base_path;
        }
        if start.is_some() {
            self.start = start;
        }
        if let Some(quiet) = quiet {
            self.quiet = quiet;
        }
        if let Some(reload_page) = reload_page {
            self.reload_page = reload_page;
        }
    }

    /// Consuming variant of [`Config::merge`].
    #[must_use]
    pub fn merged(mut self, patch: ConfigPatch) -> Self {
        self.merge(patch);
        self
    }

    /// Whether creating a pipeline stage should start the server.
    pub fn auto_start(&self) -> bool {
        self.start == Some(true)
    }
}

/// Partial configuration.
///
/// Every field is optional. `None` means "leave the current value alone".
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConfigPatch {
    /// Reload server port.
    pub port: Option<u16>,
    /// Reload server bind host.
    pub host: Option<String>,
    /// Directory stripped from reported paths.
    pub base_path: Option<PathBuf>,
    /// Start the server when a pipeline stage is created.
    pub start: Option<bool>,
    /// Suppress the per-notification "Reloaded" line.
    pub quiet: Option<bool>,
    /// Target of a full-page reload.
    pub reload_page: Option<String>,
}

impl ConfigPatch {
    /// Create an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the bind host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the base path.
    #[must_use]
    pub fn with_base_path(mut self, base_path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    /// Set the auto-start flag.
    #[must_use]
    pub fn with_start(mut self, start: bool) -> Self {
        self.start = Some(start);
        self
    }

    /// Set quiet mode.
    #[must_use]
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = Some(quiet);
        self
    }

    /// Set the full-reload target.
    #[must_use]
    pub fn with_reload_page(mut self, reload_page: impl Into<String>) -> Self {
        self.reload_page = Some(reload_page.into());
        self
    }

    /// True if the patch would not change anything.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Layer `other` on top of this patch; keys set in `other` win.
    #[must_use]
    pub fn overlay(self, other: ConfigPatch) -> Self {
        Self {
            port: other.port.or(self.port),
            host: other.host.or(self.host),
            base_path: other.base_path.or(self.base_path),
            start: other.start.or(self.start),
            quiet: other.quiet.or(self.quiet),
            reload_page: other.reload_page.or(self.reload_page),
        }
    }

    /// Load a patch from file.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `refresh.toml` in the current directory and
    /// parents, falling back to an empty patch when none is found.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            return Self::load_from_file(path);
        }

        let discovered = std::env::current_dir()
            .ok()
            .and_then(|cwd| Self::discover_from(&cwd));
        match discovered {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Parse a patch from TOML text without touching the filesystem.
    ///
    /// Environment variables are expanded; relative paths are kept as-is.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut patch: Self = toml::from_str(content)?;
        patch.expand_env_vars()?;
        Ok(patch)
    }

    /// Load a patch from a specific file.
    ///
    /// A relative `base_path` is resolved against the file's directory.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut patch = Self::from_toml_str(&content)?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        patch.resolve_paths(config_dir);

        Ok(patch)
    }

    /// Search for the config file in `start` and its parents.
    fn discover_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Expand environment variable references in string values.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref host) = self.host {
            self.host = Some(expand::expand_env(host, "host")?);
        }

        if let Some(ref base_path) = self.base_path
            && let Some(raw) = base_path.to_str()
        {
            self.base_path = Some(PathBuf::from(expand::expand_env(raw, "base_path")?));
        }

        Ok(())
    }

    /// Resolve a relative `base_path` against the config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        if let Some(ref base_path) = self.base_path
            && base_path.is_relative()
        {
            self.base_path = Some(config_dir.join(base_path));
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config key (e.g., "host").
        field: String,
        /// Error message (e.g., "${`REFRESH_HOST`} not set").
        message: String,
    },
}
