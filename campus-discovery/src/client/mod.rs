//! Per-process registration client and patch receiver.

mod providers;

pub use providers::ProviderCache;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::error::{Error, Result};
use crate::registration::{Patch, Registration};
use crate::registry::SERVICES_PATH;

/// Client half of the discovery protocol.
///
/// Owns the process-wide [`ProviderCache`] and talks to the registry's
/// well-known registration endpoint. [`routes`](Self::routes) builds the two
/// endpoints the registry needs this process to host.
pub struct DiscoveryClient {
    registry_url: String,
    http: reqwest::Client,
    providers: Arc<ProviderCache>,
}

impl DiscoveryClient {
    #[must_use]
    pub fn new(registry_url: impl Into<String>) -> Self {
        let registry_url: String = registry_url.into();
        Self {
            registry_url: registry_url.trim_end_matches('/').to_owned(),
            http: reqwest::Client::new(),
            providers: Arc::new(ProviderCache::new()),
        }
    }

    /// Shared handle to this process's provider cache.
    #[must_use]
    pub fn providers(&self) -> Arc<ProviderCache> {
        self.providers.clone()
    }

    /// Routes the registry needs this process to host: the heartbeat
    /// responder and the patch receiver, at the paths declared in the
    /// registration.
    pub fn routes(&self, registration: &Registration) -> Result<Router> {
        let heartbeat_path = registration.heartbeat_path()?;
        let update_path = registration.update_path()?;

        Ok(Router::new()
            .route(&heartbeat_path, get(heartbeat))
            .route(&update_path, post(receive_patch))
            .with_state(self.providers.clone()))
    }

    /// Register this process with the registry server.
    pub async fn register(&self, registration: &Registration) -> Result<()> {
        let res = self
            .http
            .post(self.services_endpoint())
            .json(registration)
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(Error::RegistrationRejected(res.status().as_u16()));
        }

        tracing::info!(
            service = %registration.service_name,
            registry = %self.registry_url,
            "registered with registry"
        );
        Ok(())
    }

    /// Remove this process's registration, e.g. on graceful shutdown.
    pub async fn deregister(&self, service_url: &str) -> Result<()> {
        let res = self
            .http
            .delete(self.services_endpoint())
            .body(service_url.to_owned())
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(Error::DeregistrationRejected(res.status().as_u16()));
        }

        tracing::info!(url = %service_url, "deregistered from registry");
        Ok(())
    }

    fn services_endpoint(&self) -> String {
        format!("{}{}", self.registry_url, SERVICES_PATH)
    }
}

/// Liveness, not deep health: answers 200 for as long as the process runs.
async fn heartbeat() -> StatusCode {
    StatusCode::OK
}

async fn receive_patch(
    State(providers): State<Arc<ProviderCache>>,
    Json(patch): Json<Patch>,
) -> StatusCode {
    tracing::debug!(
        added = patch.added.len(),
        removed = patch.removed.len(),
        "provider patch received"
    );
    providers.apply_patch(&patch).await;
    StatusCode::OK
}
