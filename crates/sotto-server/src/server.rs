//! `SottoServer`: Axum HTTP server wiring.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use sotto_transcription::TranscriptionEngine;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::config::ServerConfig;
use crate::routes;
use crate::shutdown::ShutdownCoordinator;

/// Shared state accessible from route handlers.
#[derive(Clone)]
pub struct AppState {
    /// Loaded engine, or `None` when startup degraded; the transcribe route
    /// answers `Server Error` until the process is restarted with a model.
    pub engine: Option<Arc<TranscriptionEngine>>,
    /// When the server started.
    pub start_time: Instant,
}

/// The HTTP service: index routes at the base path, transcribe routes under
/// the `/transcribe` prefix.
pub struct SottoServer {
    config: ServerConfig,
    state: AppState,
    shutdown: Arc<ShutdownCoordinator>,
}

impl SottoServer {
    /// Create a new server around an (optionally loaded) engine.
    pub fn new(config: ServerConfig, engine: Option<Arc<TranscriptionEngine>>) -> Self {
        Self {
            config,
            state: AppState {
                engine,
                start_time: Instant::now(),
            },
            shutdown: Arc::new(ShutdownCoordinator::new()),
        }
    }

    /// Build the Axum router with both route groups mounted.
    pub fn router(&self) -> Router {
        Router::new()
            .merge(routes::index::router())
            .nest("/transcribe", routes::transcribe::router())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Bind and serve until the shutdown token fires.
    ///
    /// Returns the bound address (useful when the configured port is 0) and
    /// the serve task handle.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener =
            tokio::net::TcpListener::bind(format!("{}:{}", self.config.host, self.config.port))
                .await?;
        let addr = listener.local_addr()?;

        let app = self.router();
        let token = self.shutdown.token();
        let handle = tokio::spawn(async move {
            let shutdown = async move { token.cancelled().await };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!(error = %e, "server error");
            }
        });

        Ok((addr, handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    fn make_server() -> SottoServer {
        SottoServer::new(ServerConfig::default(), None)
    }

    async fn body_string(resp: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn index_identifies_the_service() {
        let app = make_server().router();
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let parsed: serde_json::Value =
            serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(parsed["name"], "sotto");
        assert_eq!(parsed["status"], "ok");
        assert!(parsed["model"].as_str().unwrap().contains("whisper"));
    }

    #[tokio::test]
    async fn health_reports_engine_state() {
        let app = make_server().router();
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let parsed: serde_json::Value =
            serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["engine_loaded"], false);
        assert!(parsed["uptime_secs"].is_number());
    }

    #[tokio::test]
    async fn transcribe_without_engine_is_server_error() {
        let app = make_server().router();
        let req = Request::builder()
            .method("POST")
            .uri("/transcribe")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"path": "/tmp/clip.wav"}"#))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, "Server Error");
    }

    #[tokio::test]
    async fn transcribe_malformed_body_is_server_error() {
        let app = make_server().router();
        let req = Request::builder()
            .method("POST")
            .uri("/transcribe")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("this is not json"))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, "Server Error");
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let app = make_server().router();
        let req = Request::builder()
            .uri("/nonexistent")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn config_accessible() {
        let server = make_server();
        assert_eq!(server.config().port, 6000);
        assert_eq!(server.config().host, "127.0.0.1");
    }

    #[test]
    fn shutdown_propagates_to_coordinator() {
        let server = make_server();
        assert!(!server.shutdown().is_shutting_down());
        server.shutdown().shutdown();
        assert!(server.shutdown().is_shutting_down());
    }
}
