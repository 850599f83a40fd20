use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::catalog::CatalogError;

pub type Result<T> = std::result::Result<T, ProxyError>;

/// Failure of one proxy route; `message` is what the client sees.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("not found: {message}")]
    NotFound { message: &'static str },

    #[error("{message}: {source}")]
    Upstream {
        message: &'static str,
        #[source]
        source: CatalogError,
    },
}

impl ProxyError {
    /// Map a catalog failure, using `not_found` / `failed` as the client-facing text.
    pub fn from_catalog(err: CatalogError, not_found: &'static str, failed: &'static str) -> Self {
        if err.is_not_found() {
            ProxyError::NotFound { message: not_found }
        } else {
            ProxyError::Upstream { message: failed, source: err }
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ProxyError::NotFound { message } => (StatusCode::NOT_FOUND, "not_found", message),
            ProxyError::Upstream { message, ref source } => {
                tracing::error!("{}: {}", message, source);
                (StatusCode::INTERNAL_SERVER_ERROR, "server_error", message)
            }
        };

        (status, Json(json!({ "error": error, "message": message }))).into_response()
    }
}
