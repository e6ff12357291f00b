pub mod handlers;
pub mod models;
pub mod page;
pub mod router;
pub mod sessions;

use crate::config::Config;
use axum::routing::get;
use axum_prometheus::PrometheusMetricLayer;
use sessions::SessionRegistry;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionRegistry>,
}

pub struct ApiServer {
    state: AppState,
}

impl ApiServer {
    /// Wraps the registry in an Arc for shared handler access.
    pub fn new(sessions: SessionRegistry) -> Self {
        Self {
            state: AppState {
                sessions: Arc::new(sessions),
            },
        }
    }

    /// Binds the server to the configured port and serves until Ctrl+C.
    pub async fn run(self, config: &Config) -> anyhow::Result<()> {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();

        let app = router::build(self.state.clone())
            .route("/metrics", get(|| async move { metric_handle.render() }))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(CorsLayer::permissive()),
            )
            .layer(prometheus_layer);

        let addr = SocketAddr::from(([0, 0, 0, 0], config.api_port));
        tracing::info!("API server listening on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        // unmount every session so nothing outlives the server
        self.state.sessions.close_all();
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down...");
}
