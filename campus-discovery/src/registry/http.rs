//! HTTP surface of the registry server.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use super::store::ServiceRegistry;
use crate::error::Error;
use crate::registration::Registration;

/// Well-known path services register against.
pub const SERVICES_PATH: &str = "/services";

/// Router exposing registration and deregistration.
pub fn create_router(registry: Arc<ServiceRegistry>) -> Router {
    Router::new()
        .route(SERVICES_PATH, post(register).delete(deregister))
        .layer(TraceLayer::new_for_http())
        .with_state(registry)
}

/// `POST /services` with a JSON registration body.
async fn register(
    State(registry): State<Arc<ServiceRegistry>>,
    payload: Result<Json<Registration>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(registration) =
        payload.map_err(|e| ApiError::from(Error::Serialization(e.to_string())))?;
    registry.register(registration).await?;
    Ok(StatusCode::OK)
}

/// `DELETE /services` with the instance's service URL as the raw body.
async fn deregister(
    State(registry): State<Arc<ServiceRegistry>>,
    body: String,
) -> Result<StatusCode, ApiError> {
    let name = registry.deregister(body.trim()).await?;
    tracing::info!(service = %name, "registration removed");
    Ok(StatusCode::OK)
}

/// Error envelope returned by the registry endpoints.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    status: u16,
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::Validation(_) | Error::Serialization(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
            status: self.status.as_u16(),
        });
        (self.status, body).into_response()
    }
}
