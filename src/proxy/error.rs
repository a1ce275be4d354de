//! Relay errors with structured JSON responses.

use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Error body returned by the relay itself (never by the backend).
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub detail: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("Backend unreachable at {backend_url}: {message}")]
    BackendUnreachable { backend_url: String, message: String },
    #[error("Invalid relay prefix: {0:?}")]
    InvalidPrefix(String),
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
    #[error("Failed to bind relay on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, error, detail) = match &self {
            ProxyError::BackendUnreachable { backend_url, message } => {
                tracing::warn!(backend_url, message, "relay could not reach backend");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "backend_unreachable",
                    format!(
                        "Не удалось подключиться к бэкенду ({backend_url}). Убедитесь, что сервер запущен."
                    ),
                )
            }
            other => {
                tracing::error!(error = %other, "relay internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "An internal error occurred".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error, detail })).into_response()
    }
}
