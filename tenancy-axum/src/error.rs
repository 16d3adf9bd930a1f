use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tenancy_core::{IsolationError, ServiceError};
use tracing::error;

/// Any pipeline error, rendered as a Feathers-style JSON body.
#[derive(Debug)]
pub struct TenancyAxumError(pub anyhow::Error);

impl From<anyhow::Error> for TenancyAxumError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl From<ServiceError> for TenancyAxumError {
    fn from(e: ServiceError) -> Self {
        Self(e.into_anyhow())
    }
}

impl From<IsolationError> for TenancyAxumError {
    fn from(e: IsolationError) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for TenancyAxumError {
    fn into_response(self) -> Response {
        let normalized = ServiceError::normalize(self.0);
        if normalized.code() >= 500 {
            error!(error = %normalized, source = ?normalized.source, "request failed");
        }

        let safe = normalized.sanitize_for_client();
        let status =
            StatusCode::from_u16(safe.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(safe.to_json())).into_response()
    }
}
