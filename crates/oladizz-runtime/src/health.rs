//! Plain-text liveness endpoint.
//!
//! Hosting platforms that expect a bound port get `200 OK` with the
//! configured body on `GET /` and `GET /health`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::HealthConfig;
use crate::error::{RuntimeError, RuntimeResult};

/// A running health server.
#[derive(Debug)]
pub struct HealthServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl HealthServer {
    /// Binds `config.addr()` and serves until `shutdown` is cancelled.
    pub async fn bind(config: &HealthConfig, shutdown: CancellationToken) -> RuntimeResult<Self> {
        let listener = TcpListener::bind(config.addr())
            .await
            .map_err(|e| RuntimeError::Bind {
                addr: config.addr(),
                source: e,
            })?;
        let addr = listener.local_addr()?;
        let app = router(&config.body);

        info!(addr = %addr, "Health endpoint listening");

        let handle = tokio::spawn(async move {
            let server = axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await });
            if let Err(e) = server.await {
                error!(error = %e, "Health endpoint failed");
            }
        });

        Ok(Self { addr, handle })
    }

    /// The bound address (useful when port 0 was requested).
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Waits for the server task after its shutdown token fired.
    pub async fn stopped(self) {
        if let Err(e) = self.handle.await {
            error!(error = %e, "Health endpoint task panicked");
        }
    }
}

/// Routes of the health endpoint.
pub fn router(body: &str) -> Router {
    let body: Arc<str> = Arc::from(body);
    Router::new()
        .route("/", get(respond))
        .route("/health", get(respond))
        .with_state(body)
}

async fn respond(State(body): State<Arc<str>>) -> String {
    body.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn get_path(path: &str) -> (StatusCode, String) {
        let response = router("alive")
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), 1024).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_root_and_health_routes() {
        assert_eq!(get_path("/").await, (StatusCode::OK, "alive".to_string()));
        assert_eq!(get_path("/health").await, (StatusCode::OK, "alive".to_string()));
        assert_eq!(get_path("/other").await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_bind_and_shutdown() {
        let config = HealthConfig {
            host: "127.0.0.1".into(),
            port: 0,
            ..Default::default()
        };
        let token = CancellationToken::new();
        let server = HealthServer::bind(&config, token.clone()).await.unwrap();
        assert_ne!(server.local_addr().port(), 0);

        token.cancel();
        server.stopped().await;
    }
}
