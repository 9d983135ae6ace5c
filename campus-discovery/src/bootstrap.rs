//! Service process lifecycle: bind, register, serve, deregister.

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use url::Url;

use crate::client::DiscoveryClient;
use crate::error::{Error, Result};
use crate::registration::Registration;

/// Serve `app` at the registration's service address, wired into discovery.
///
/// The heartbeat responder and patch receiver are merged into the
/// application router before the listener starts, the process is registered
/// once it is able to serve, and a best-effort deregistration runs when the
/// shutdown signal arrives. A bind or registration failure is fatal.
pub async fn serve(
    client: &DiscoveryClient,
    registration: Registration,
    app: Router,
) -> Result<()> {
    let addr = bind_addr(&registration.service_url)?;
    let router = client
        .routes(&registration)?
        .merge(app)
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(service = %registration.service_name, %addr, "listening");

    let shutdown = CancellationToken::new();
    let server_shutdown = shutdown.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
            .await
    });

    if let Err(e) = client.register(&registration).await {
        shutdown.cancel();
        return Err(e);
    }

    wait_for_shutdown_signal().await;
    tracing::info!(service = %registration.service_name, "shutting down");

    if let Err(e) = client.deregister(&registration.service_url).await {
        tracing::warn!(error = %e, "deregistration failed during shutdown");
    }

    shutdown.cancel();
    match server.await {
        Ok(serve_result) => serve_result?,
        Err(e) => tracing::warn!(error = %e, "server task failed"),
    }

    Ok(())
}

/// The `host:port` a service binds, derived from its advertised base URL.
fn bind_addr(service_url: &str) -> Result<String> {
    let url = Url::parse(service_url)
        .map_err(|e| Error::Validation(format!("invalid service url {service_url}: {e}")))?;
    let host = url
        .host_str()
        .ok_or_else(|| Error::Validation(format!("service url {service_url} has no host")))?;
    let port = url
        .port_or_known_default()
        .ok_or_else(|| Error::Validation(format!("service url {service_url} has no port")))?;
    Ok(format!("{host}:{port}"))
}

async fn wait_for_shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_addr_from_service_url() {
        assert_eq!(bind_addr("http://localhost:6000").unwrap(), "localhost:6000");
        assert_eq!(bind_addr("http://example.com").unwrap(), "example.com:80");
    }

    #[test]
    fn test_bind_addr_rejects_malformed_url() {
        assert!(matches!(bind_addr("not a url"), Err(Error::Validation(_))));
    }
}
