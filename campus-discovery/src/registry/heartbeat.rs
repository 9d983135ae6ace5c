//! Periodic heartbeat sweep over all registrations.

use std::sync::Arc;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use super::store::ServiceRegistry;
use crate::config::HeartbeatConfig;
use crate::error::Error;
use crate::registration::Registration;

/// Terminal outcome of one instance's probes within a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProbeOutcome {
    /// Every probe this tick succeeded before any eviction.
    Healthy,
    /// The instance failed and stayed evicted.
    Evicted,
    /// The instance failed, then answered again and was re-registered.
    Recovered,
}

/// Supervises liveness of every registered instance.
///
/// Each tick snapshots the registration list, probes all instances
/// concurrently, waits for every probe to finish, then sleeps the sweep
/// interval. A failing instance is deregistered on its first failed attempt
/// so dependents learn quickly; if it answers again within the same tick it
/// is re-registered and dependents receive a fresh `added` patch. Transport
/// errors and non-success statuses are treated alike, and no probe state
/// survives across ticks.
pub struct HeartbeatMonitor {
    registry: Arc<ServiceRegistry>,
    config: HeartbeatConfig,
    http: reqwest::Client,
    cancel_token: CancellationToken,
}

impl HeartbeatMonitor {
    #[must_use]
    pub fn new(registry: Arc<ServiceRegistry>, config: HeartbeatConfig) -> Self {
        Self {
            registry,
            config,
            http: reqwest::Client::new(),
            cancel_token: CancellationToken::new(),
        }
    }

    /// Start the sweep loop.
    ///
    /// Returns the `JoinHandle` so the caller can detect task completion.
    /// Use [`shutdown`](Self::shutdown) to stop the loop.
    pub fn start(&self) -> tokio::task::JoinHandle<()> {
        let registry = self.registry.clone();
        let config = self.config.clone();
        let http = self.http.clone();
        let cancel_token = self.cancel_token.clone();

        tokio::spawn(async move {
            loop {
                let instances = registry.registrations().await;
                let probes = instances.into_iter().map(|registration| {
                    Self::probe_instance(&registry, &http, &config, registration)
                });
                join_all(probes).await;

                tokio::select! {
                    () = cancel_token.cancelled() => {
                        tracing::info!("heartbeat monitor shutting down");
                        return;
                    }
                    () = tokio::time::sleep(config.sweep_interval()) => {}
                }
            }
        })
    }

    /// Stop the sweep loop after the current tick.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }

    async fn probe_instance(
        registry: &ServiceRegistry,
        http: &reqwest::Client,
        config: &HeartbeatConfig,
        registration: Registration,
    ) -> ProbeOutcome {
        let mut evicted = false;

        for attempt in 1..=config.max_attempts {
            let healthy = match http
                .get(&registration.heartbeat_url)
                .timeout(config.probe_timeout())
                .send()
                .await
            {
                Ok(res) => res.status().is_success(),
                Err(e) => {
                    tracing::debug!(
                        service = %registration.service_name,
                        error = %e,
                        "heartbeat probe did not complete"
                    );
                    false
                }
            };

            if healthy {
                if !evicted {
                    tracing::debug!(service = %registration.service_name, "health check OK");
                    return ProbeOutcome::Healthy;
                }
                tracing::info!(
                    service = %registration.service_name,
                    url = %registration.service_url,
                    "heartbeat recovered, re-registering"
                );
                if let Err(e) = registry.register(registration.clone()).await {
                    tracing::warn!(
                        service = %registration.service_name,
                        error = %e,
                        "re-registration after recovery failed"
                    );
                    return ProbeOutcome::Evicted;
                }
                return ProbeOutcome::Recovered;
            }

            if !evicted {
                tracing::warn!(
                    service = %registration.service_name,
                    url = %registration.service_url,
                    attempt,
                    "health check failed, deregistering"
                );
                match registry.deregister(&registration.service_url).await {
                    Ok(_) => {}
                    // A concurrent deregistration already removed it.
                    Err(Error::NotFound(_)) => {}
                    Err(e) => {
                        tracing::warn!(
                            service = %registration.service_name,
                            error = %e,
                            "eviction failed"
                        );
                    }
                }
                evicted = true;
            }

            if attempt < config.max_attempts {
                tokio::time::sleep(config.retry_backoff()).await;
            }
        }

        tracing::warn!(
            service = %registration.service_name,
            url = %registration.service_url,
            attempts = config.max_attempts,
            "health check failed for the whole tick"
        );
        ProbeOutcome::Evicted
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use tokio::net::TcpListener;

    use super::*;
    use crate::registration::ServiceName;

    async fn fail_first(State(hits): State<Arc<AtomicU32>>) -> StatusCode {
        if hits.fetch_add(1, Ordering::SeqCst) == 0 {
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            StatusCode::OK
        }
    }

    async fn spawn_flaky_instance() -> (String, Arc<AtomicU32>) {
        let hits = Arc::new(AtomicU32::new(0));
        let router = Router::new()
            .route("/heartbeat", get(fail_first))
            .with_state(hits.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        (format!("http://{addr}"), hits)
    }

    fn fast_config() -> HeartbeatConfig {
        HeartbeatConfig {
            sweep_interval_secs: 3600,
            max_attempts: 3,
            retry_backoff_secs: 0,
            probe_timeout_secs: 2,
        }
    }

    #[tokio::test]
    async fn test_flapping_instance_is_evicted_then_recovered() {
        let registry = ServiceRegistry::new();
        let (url, hits) = spawn_flaky_instance().await;
        let registration = Registration::new(ServiceName::LogSink, url);
        registry.register(registration.clone()).await.unwrap();

        let config = fast_config();
        let outcome =
            HeartbeatMonitor::probe_instance(&registry, &reqwest::Client::new(), &config, registration)
                .await;

        assert_eq!(outcome, ProbeOutcome::Recovered);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(registry.registrations().await.len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_instance_is_evicted_after_all_attempts() {
        let registry = ServiceRegistry::new();

        // Bind then drop the listener so probes hit a closed port.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let registration = Registration::new(ServiceName::Grading, format!("http://{addr}"));
        registry.register(registration.clone()).await.unwrap();

        let config = fast_config();
        let outcome =
            HeartbeatMonitor::probe_instance(&registry, &reqwest::Client::new(), &config, registration)
                .await;

        assert_eq!(outcome, ProbeOutcome::Evicted);
        assert!(registry.registrations().await.is_empty());
    }
}
