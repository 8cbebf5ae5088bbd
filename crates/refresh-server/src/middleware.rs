//! Embeddable live-reload routes.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use crate::notification::{Notification, NotificationBody};
use crate::websocket::ws_handler;
use crate::ws::{Hub, WsServer};

/// WebSocket endpoint browsers connect to.
pub const LIVERELOAD_PATH: &str = "/livereload";

/// Endpoint accepting change notifications over HTTP.
pub const CHANGED_PATH: &str = "/changed";

/// Routes of `server`, for merging into another axum application.
///
/// Notifications arriving through these routes reach the same clients as
/// [`ReloadServer::changed`](crate::ReloadServer::changed).
pub fn middleware(server: &WsServer) -> Router {
    Router::new()
        .route(LIVERELOAD_PATH, get(ws_handler))
        .route(CHANGED_PATH, post(changed_handler))
        .with_state(server.hub())
}

/// Broadcast files posted as `{"files": [...]}`.
async fn changed_handler(
    State(hub): State<Hub>,
    Json(body): Json<NotificationBody>,
) -> Json<Value> {
    let notification = Notification::from(body);
    hub.broadcast(&notification);

    Json(json!({
        "clients": hub.clients(),
        "files": notification.files(),
    }))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use pretty_assertions::assert_eq;
    use refresh_config::Config;
    use tower::ServiceExt;

    use super::*;

    fn post_changed(body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(CHANGED_PATH)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_post_changed_broadcasts() {
        let server = WsServer::new(&Config::default());
        let mut rx = server.subscribe();

        let response = middleware(&server)
            .oneshot(post_changed(r#"{"files": ["/a.css", "/b.js"]}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(rx.try_recv().unwrap().path(), "/a.css");
        assert_eq!(rx.try_recv().unwrap().path(), "/b.js");
    }

    #[tokio::test]
    async fn test_post_changed_rejects_bad_json() {
        let server = WsServer::new(&Config::default());

        let response = middleware(&server)
            .oneshot(post_changed("not json"))
            .await
            .unwrap();

        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_livereload_requires_upgrade() {
        let server = WsServer::new(&Config::default());

        let response = middleware(&server)
            .oneshot(
                Request::builder()
                    .uri(LIVERELOAD_PATH)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.status().is_client_error());
    }
}
