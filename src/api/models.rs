use crate::errors::ViewError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

/// Body of every non-2xx JSON response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for ViewError {
    fn into_response(self) -> Response {
        let status = match self {
            // the control is disabled; the client should wait for the state to settle
            ViewError::Busy | ViewError::NoCurrentRate => StatusCode::CONFLICT,
            ViewError::Closed => StatusCode::SERVICE_UNAVAILABLE,
        };

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
