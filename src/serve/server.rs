// src/serve/server.rs

//! HTTP server for the public directory with live reload.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::State,
    http::header,
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
    routing::get,
};
use futures::stream::{self, Stream};
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::serve::reload::ReloadHub;

pub const LIVERELOAD_PATH: &str = "/__assetdag/livereload.js";
pub const EVENTS_PATH: &str = "/__assetdag/events";

/// Client script: include with
/// `<script src="/__assetdag/livereload.js"></script>`.
pub const LIVERELOAD_JS: &str = r#"(function () {
  var source = new EventSource("/__assetdag/events");
  source.addEventListener("reload", function () {
    window.location.reload();
  });
})();
"#;

#[derive(Clone)]
struct ServerState {
    reload: ReloadHub,
}

/// Routes for the reload script and event stream; everything else is
/// served from `dir`.
pub fn create_router(dir: impl Into<PathBuf>, reload: ReloadHub) -> Router {
    Router::new()
        .route(LIVERELOAD_PATH, get(livereload_script))
        .route(EVENTS_PATH, get(reload_events))
        .fallback_service(ServeDir::new(dir.into()))
        .layer(TraceLayer::new_for_http())
        .with_state(ServerState { reload })
}

async fn livereload_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        LIVERELOAD_JS,
    )
}

async fn reload_events(
    State(state): State<ServerState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    debug!("browser subscribed to reload events");
    let rx = state.reload.subscribe();

    let events = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(notice) => {
                    let event = Event::default()
                        .event("reload")
                        .id(notice.rebuild_id.to_string())
                        .data(notice.tasks.join(","));
                    return Some((Ok(event), rx));
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "reload subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

/// A running dev server.
#[derive(Debug)]
pub struct ServerHandle {
    pub local_addr: SocketAddr,
    pub handle: JoinHandle<()>,
}

/// Bind `addr` and serve in the background.
pub async fn spawn_server(
    addr: SocketAddr,
    dir: impl Into<PathBuf>,
    reload: ReloadHub,
) -> Result<ServerHandle> {
    let dir = dir.into();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding dev server to {addr}"))?;
    let local_addr = listener.local_addr()?;
    let app = create_router(dir.clone(), reload);

    info!(%local_addr, dir = ?dir, "dev server listening");

    let handle = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            error!(error = %err, "dev server stopped");
        }
    });

    Ok(ServerHandle { local_addr, handle })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn serves_reload_script_and_public_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>hi</h1>").unwrap();
        let app = create_router(dir.path(), ReloadHub::default());

        let resp = app
            .clone()
            .oneshot(Request::get(LIVERELOAD_PATH).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains("EventSource"));

        let resp = app
            .oneshot(Request::get("/index.html").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"<h1>hi</h1>");
    }
}
