//! Health checks for mailrack components.
//!
//! Components implement [`HealthCheck`]; [`HealthServer`] exposes the
//! aggregated results over HTTP for observability tooling and
//! orchestrator probes.
//!
//! # Endpoints
//!
//! - **`/health`** - Aggregated component health: 200 when every
//!   component is healthy, 503 with the degraded components otherwise
//! - **`/health/live`** - Liveness probe: 200 whenever the process can
//!   respond
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mailrack_health::{HealthCheck, HealthConfig, HealthServer};
//!
//! # async fn example(checks: Vec<Arc<dyn HealthCheck>>) -> Result<(), Box<dyn std::error::Error>> {
//! let config = HealthConfig::default();
//! let server = HealthServer::new(config, checks).await?;
//! // server.serve(shutdown_receiver).await?;
//! # Ok(())
//! # }
//! ```

mod check;
mod config;
mod error;
mod server;

pub use check::{ComponentHealth, HealthCheck, HealthStatus};
pub use config::HealthConfig;
pub use error::HealthError;
pub use server::HealthServer;
