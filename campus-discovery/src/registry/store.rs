//! Authoritative registration list and patch delivery.

use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::registration::{Patch, PatchEntry, Registration, ServiceName};

/// Single source of truth for live registrations.
///
/// The list is guarded by one reader/writer lock; mutations exclude all
/// readers, while patch delivery and heartbeat probing read snapshots.
/// Pushes to dependents are fire-and-forget: they never block or fail the
/// mutation that triggered them, and undelivered patches are not retried.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    registrations: RwLock<Vec<Registration>>,
    http: reqwest::Client,
}

impl ServiceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service instance.
    ///
    /// Validates the embedded addresses, stores the registration, sends the
    /// new instance a catch-up snapshot of already-live providers it
    /// requires, and announces the instance to every other dependent.
    /// A previous registration with the same `service_url` is replaced, so
    /// re-registration is idempotent.
    pub async fn register(&self, registration: Registration) -> Result<()> {
        registration.validate()?;

        let snapshot: Vec<PatchEntry> = {
            let mut registrations = self.registrations.write().await;
            registrations.retain(|r| r.service_url != registration.service_url);
            let snapshot = registrations
                .iter()
                .filter(|r| registration.required_services.contains(&r.service_name))
                .map(Registration::entry)
                .collect();
            registrations.push(registration.clone());
            snapshot
        };

        tracing::info!(
            service = %registration.service_name,
            url = %registration.service_url,
            "service registered"
        );

        if !snapshot.is_empty() {
            self.spawn_push(Patch::added(snapshot), registration.service_update_url.clone());
        }

        self.broadcast(
            Patch::added(vec![registration.entry()]),
            Some(&registration.service_url),
        )
        .await;

        Ok(())
    }

    /// Remove the registration identified by `service_url` and withdraw it
    /// from every remaining dependent.
    pub async fn deregister(&self, service_url: &str) -> Result<ServiceName> {
        let removed = {
            let mut registrations = self.registrations.write().await;
            let index = registrations
                .iter()
                .position(|r| r.service_url == service_url)
                .ok_or_else(|| {
                    Error::NotFound(format!("no registration for url {service_url}"))
                })?;
            registrations.remove(index)
        };

        tracing::info!(
            service = %removed.service_name,
            url = %removed.service_url,
            "service deregistered"
        );

        self.broadcast(Patch::removed(vec![removed.entry()]), None).await;

        Ok(removed.service_name)
    }

    /// Snapshot of the current registration list.
    pub async fn registrations(&self) -> Vec<Registration> {
        self.registrations.read().await.clone()
    }

    /// Push the relevant subset of `patch` to every current registration.
    ///
    /// Each push runs in its own task; one dependent being slow or dead does
    /// not delay delivery to the others.
    async fn broadcast(&self, patch: Patch, exclude_url: Option<&str>) {
        let targets: Vec<Registration> = {
            let registrations = self.registrations.read().await;
            registrations
                .iter()
                .filter(|r| exclude_url != Some(r.service_url.as_str()))
                .cloned()
                .collect()
        };

        for target in targets {
            let subset = patch.restricted_to(&target.required_services);
            if subset.is_empty() {
                continue;
            }
            self.spawn_push(subset, target.service_update_url);
        }
    }

    fn spawn_push(&self, patch: Patch, update_url: String) {
        let client = self.http.clone();
        tokio::spawn(async move {
            match client.post(&update_url).json(&patch).send().await {
                Ok(res) if res.status().is_success() => {
                    tracing::debug!(url = %update_url, "patch delivered");
                }
                Ok(res) => {
                    tracing::warn!(url = %update_url, status = %res.status(), "patch push rejected");
                }
                Err(e) => {
                    tracing::warn!(url = %update_url, error = %e, "patch push failed");
                }
            }
        });
    }
}
