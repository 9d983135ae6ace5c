//! Remote log sink service and its client-side forwarder.
//!
//! The sink appends every posted line, timestamped, to a single file. Other
//! services forward their business events to it through [`RemoteLogger`],
//! which resolves the sink's address from the provider cache on every call.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use campus_discovery::{ProviderCache, ServiceName};

/// Append-only sink shared by the `/log` handler.
#[derive(Clone)]
pub struct LogSink {
    file: Arc<Mutex<tokio::fs::File>>,
}

impl LogSink {
    pub async fn open(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.into())
            .await?;
        Ok(Self {
            file: Arc::new(Mutex::new(file)),
        })
    }

    /// Append one timestamped line.
    pub async fn append(&self, line: &str) -> std::io::Result<()> {
        let stamped = format!("{} {}\n", Utc::now().to_rfc3339(), line.trim_end());
        let mut file = self.file.lock().await;
        file.write_all(stamped.as_bytes()).await?;
        file.flush().await
    }
}

/// Router hosting the sink's single endpoint.
pub fn create_router(sink: LogSink) -> Router {
    Router::new().route("/log", post(write_log)).with_state(sink)
}

async fn write_log(State(sink): State<LogSink>, body: String) -> StatusCode {
    match sink.append(&body).await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::error!(error = %e, "failed to append log line");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Forwards application events to whichever log sink instance the provider
/// cache currently knows about.
#[derive(Clone)]
pub struct RemoteLogger {
    source: ServiceName,
    providers: Arc<ProviderCache>,
    http: reqwest::Client,
}

impl RemoteLogger {
    #[must_use]
    pub fn new(source: ServiceName, providers: Arc<ProviderCache>) -> Self {
        Self {
            source,
            providers,
            http: reqwest::Client::new(),
        }
    }

    /// Best effort: the line stays local when no sink is reachable.
    pub async fn log(&self, message: &str) {
        let provider = match self.providers.get_provider(ServiceName::LogSink).await {
            Ok(url) => url,
            Err(_) => {
                tracing::warn!(
                    source = %self.source,
                    line = message,
                    "no log sink provider, keeping line local"
                );
                return;
            }
        };

        let line = format!("[{}] {message}", self.source);
        match self.http.post(format!("{provider}/log")).body(line).send().await {
            Ok(res) if res.status().is_success() => {}
            Ok(res) => {
                tracing::warn!(status = %res.status(), "log sink rejected line");
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to reach log sink");
            }
        }
    }
}
