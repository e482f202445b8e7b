//! The seam between the poll loop and the network.

use std::sync::Arc;

use async_trait::async_trait;
use chirp_api::{BackendClient, HealthError};
use chirp_types::HealthReport;
use tokio_util::sync::CancellationToken;

/// One bounded health check against the backend.
///
/// Implementations must race the exchange against `cancel` and surface an
/// observed cancellation as [`HealthError::Cancelled`]; the monitor relies on
/// that to distinguish its own deadline from an external `stop()`.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn check(&self, cancel: &CancellationToken) -> Result<HealthReport, HealthError>;
}

#[async_trait]
impl HealthProbe for BackendClient {
    async fn check(&self, cancel: &CancellationToken) -> Result<HealthReport, HealthError> {
        self.health(cancel).await
    }
}

/// Allows a shared client to serve both the monitor and the chat sender.
#[async_trait]
impl<P: HealthProbe> HealthProbe for Arc<P> {
    async fn check(&self, cancel: &CancellationToken) -> Result<HealthReport, HealthError> {
        self.as_ref().check(cancel).await
    }
}
