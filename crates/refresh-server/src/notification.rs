//! Change notifications and the events pushed to browsers.

use serde::{Deserialize, Serialize};

/// Notification envelope accepted by [`ReloadServer::changed`].
///
/// Serializes as `{"body": {"files": [...]}}`.
///
/// [`ReloadServer::changed`]: crate::ReloadServer::changed
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Notification payload.
    pub body: NotificationBody,
}

/// Payload of a [`Notification`].
///
/// This is also the JSON body accepted by `POST /changed`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationBody {
    /// Changed file paths, as they should be reported to clients.
    #[serde(default)]
    pub files: Vec<String>,
}

impl Notification {
    /// Notification for a single changed file.
    #[must_use]
    pub fn single(path: impl Into<String>) -> Self {
        Self {
            body: NotificationBody {
                files: vec![path.into()],
            },
        }
    }

    /// Changed file paths.
    pub fn files(&self) -> &[String] {
        &self.body.files
    }
}

impl From<NotificationBody> for Notification {
    fn from(body: NotificationBody) -> Self {
        Self { body }
    }
}

/// Event sent to connected WebSocket clients when a file changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReloadEvent {
    /// Event type (always "reload").
    #[serde(rename = "type")]
    event_type: String,
    /// Path that changed.
    path: String,
}

impl ReloadEvent {
    /// Reload event for `path`.
    #[must_use]
    pub fn reload(path: impl Into<String>) -> Self {
        Self {
            event_type: "reload".to_owned(),
            path: path.into(),
        }
    }

    /// Path that changed.
    pub fn path(&self) -> &str {
        &self.path
    }
}
