//! Heartbeat supervision against live loopback instances.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use campus_discovery::{
    HeartbeatConfig, HeartbeatMonitor, Patch, Registration, ServiceName, ServiceRegistry,
};

async fn heartbeat_ok() -> StatusCode {
    StatusCode::OK
}

async fn heartbeat_fail_first(State(hits): State<Arc<AtomicU32>>) -> StatusCode {
    if hits.fetch_add(1, Ordering::SeqCst) == 0 {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    }
}

struct Dependent {
    registration: Registration,
    patches: mpsc::UnboundedReceiver<Patch>,
}

async fn capture_patch(
    State(tx): State<mpsc::UnboundedSender<Patch>>,
    Json(patch): Json<Patch>,
) -> StatusCode {
    tx.send(patch).ok();
    StatusCode::OK
}

/// A healthy grading instance that depends on the log sink and records the
/// patches pushed to it.
async fn spawn_dependent() -> Dependent {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, patches) = mpsc::unbounded_channel();
    let router = Router::new()
        .route("/heartbeat", get(heartbeat_ok))
        .route("/services", post(capture_patch))
        .with_state(tx);
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let registration = Registration::new(ServiceName::Grading, format!("http://{addr}"))
        .with_required(vec![ServiceName::LogSink]);
    Dependent {
        registration,
        patches,
    }
}

struct FlakyInstance {
    registration: Registration,
    hits: Arc<AtomicU32>,
}

/// A log sink whose heartbeat fails once, then answers 200.
async fn spawn_flaky_instance() -> FlakyInstance {
    let hits = Arc::new(AtomicU32::new(0));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = Router::new()
        .route("/heartbeat", get(heartbeat_fail_first))
        .with_state(hits.clone());
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    FlakyInstance {
        registration: Registration::new(ServiceName::LogSink, format!("http://{addr}")),
        hits,
    }
}

async fn next_patch(dependent: &mut Dependent) -> Patch {
    tokio::time::timeout(Duration::from_secs(10), dependent.patches.recv())
        .await
        .expect("timed out waiting for a patch")
        .expect("patch channel closed")
}

#[tokio::test]
async fn test_flapping_instance_recovers_within_one_tick() {
    let registry = Arc::new(ServiceRegistry::new());

    let mut dependent = spawn_dependent().await;
    registry.register(dependent.registration.clone()).await.unwrap();

    let flaky = spawn_flaky_instance().await;
    registry.register(flaky.registration.clone()).await.unwrap();

    let added = next_patch(&mut dependent).await;
    assert_eq!(added, Patch::added(vec![flaky.registration.entry()]));

    let monitor = HeartbeatMonitor::new(
        registry.clone(),
        HeartbeatConfig {
            sweep_interval_secs: 3600,
            max_attempts: 3,
            retry_backoff_secs: 1,
            probe_timeout_secs: 2,
        },
    );
    let sweep = monitor.start();

    // Evicted on the first failed probe of the tick...
    let removed = next_patch(&mut dependent).await;
    assert_eq!(removed, Patch::removed(vec![flaky.registration.entry()]));

    // ...and re-announced after answering the retry within the same tick.
    let readded = next_patch(&mut dependent).await;
    assert_eq!(readded, Patch::added(vec![flaky.registration.entry()]));

    assert_eq!(registry.registrations().await.len(), 2);
    assert!(flaky.hits.load(Ordering::SeqCst) >= 2);

    monitor.shutdown();
    sweep.await.unwrap();
}

#[tokio::test]
async fn test_dead_instance_is_evicted_and_dependents_notified() {
    let registry = Arc::new(ServiceRegistry::new());

    let mut dependent = spawn_dependent().await;
    registry.register(dependent.registration.clone()).await.unwrap();

    // An instance that is already gone: bind, then drop the listener.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let dead = Registration::new(ServiceName::LogSink, format!("http://{addr}"));
    registry.register(dead.clone()).await.unwrap();
    let added = next_patch(&mut dependent).await;
    assert_eq!(added, Patch::added(vec![dead.entry()]));

    let monitor = HeartbeatMonitor::new(
        registry.clone(),
        HeartbeatConfig {
            sweep_interval_secs: 3600,
            max_attempts: 3,
            retry_backoff_secs: 0,
            probe_timeout_secs: 1,
        },
    );
    let sweep = monitor.start();

    let removed = next_patch(&mut dependent).await;
    assert_eq!(removed, Patch::removed(vec![dead.entry()]));

    // Let the tick drain; only the dependent must remain registered.
    tokio::time::sleep(Duration::from_millis(300)).await;
    let remaining = registry.registrations().await;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].service_url, dependent.registration.service_url);

    monitor.shutdown();
    sweep.await.unwrap();
}
