//! Health check HTTP server.

use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use mailrack_common::Signal;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;

use crate::{ComponentHealth, HealthCheck, HealthConfig, HealthError};

type Checks = Arc<Vec<Arc<dyn HealthCheck>>>;

/// Health check HTTP server.
///
/// Serves `/health` (aggregated component health) and `/health/live`
/// (liveness) until a shutdown signal arrives.
pub struct HealthServer {
    listener: TcpListener,
    router: Router,
}

impl HealthServer {
    /// Create a new health server bound to the configured address.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the specified address fails.
    pub async fn new(
        config: HealthConfig,
        checks: Vec<Arc<dyn HealthCheck>>,
    ) -> Result<Self, HealthError> {
        let listener = TcpListener::bind(&config.listen_address)
            .await
            .map_err(|e| HealthError::BindError {
                address: config.listen_address.clone(),
                source: e,
            })?;

        tracing::info!(
            address = %config.listen_address,
            "Health check server bound successfully"
        );

        let router = Router::new()
            .route("/health", get(health_handler))
            .route("/health/live", get(liveness_handler))
            .with_state(Arc::new(checks))
            // Probes must answer quickly even when a backing store hangs
            .layer(TimeoutLayer::new(Duration::from_secs(5)));

        Ok(Self { listener, router })
    }

    /// Run the health server until a shutdown signal is received.
    ///
    /// # Errors
    ///
    /// Returns an error if the server encounters a runtime error.
    pub async fn serve(
        self,
        mut shutdown: tokio::sync::broadcast::Receiver<Signal>,
    ) -> Result<(), HealthError> {
        tracing::info!("Health check server starting");

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Health check server received shutdown signal");
            })
            .await
            .map_err(|e| HealthError::ServerError(e.to_string()))?;

        tracing::info!("Health check server stopped");
        Ok(())
    }
}

/// Aggregated health handler.
///
/// Runs every registered check; 200 when all components are healthy,
/// 503 with the component reports otherwise. No registered checks means
/// there is nothing to be unhealthy about.
async fn health_handler(State(checks): State<Checks>) -> Response {
    let mut components = Vec::with_capacity(checks.len());
    for check in checks.iter() {
        components.push(check.check().await);
    }

    if components.iter().all(ComponentHealth::is_healthy) {
        (StatusCode::OK, Json(components)).into_response()
    } else {
        for component in components.iter().filter(|health| !health.is_healthy()) {
            tracing::warn!(
                component = %component.component,
                message = component.message.as_deref().unwrap_or_default(),
                "Component reported degraded"
            );
        }
        (StatusCode::SERVICE_UNAVAILABLE, Json(components)).into_response()
    }
}

/// Liveness probe handler.
///
/// Returns 200 OK whenever the process can respond at all; the
/// orchestrator detects a dead process through the probe timeout.
async fn liveness_handler() -> Response {
    (StatusCode::OK, "OK").into_response()
}
