//! Mapping of license errors onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tollgate_license::LicenseError;

/// Body of every failed admin request.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// A [`LicenseError`] on its way out of a handler.
#[derive(Debug)]
pub struct ApiError(pub LicenseError);

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        status_of(&self.0)
    }
}

impl From<LicenseError> for ApiError {
    fn from(err: LicenseError) -> Self {
        Self(err)
    }
}

/// HTTP status for a license error.
#[must_use]
pub fn status_of(err: &LicenseError) -> StatusCode {
    match err {
        LicenseError::NotFound { .. }
        | LicenseError::ProductNotFound(_)
        | LicenseError::PlanNotFound { .. } => StatusCode::NOT_FOUND,
        LicenseError::Conflict { .. }
        | LicenseError::AlreadyActive
        | LicenseError::AlreadyInactive => StatusCode::CONFLICT,
        LicenseError::InvalidKeyType(_)
        | LicenseError::InvalidKeySpec(_)
        | LicenseError::AlgKeyMismatch { .. }
        | LicenseError::UnsupportedAlg(_)
        | LicenseError::MalformedToken(_)
        | LicenseError::SigningKey(_) => StatusCode::BAD_REQUEST,
        LicenseError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        } else {
            tracing::debug!(error = %self.0, %status, "Request rejected");
        }
        (
            status,
            Json(ErrorBody {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}
