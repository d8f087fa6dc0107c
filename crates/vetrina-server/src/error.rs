use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use vetrina_core::error::{ErrorKind, ExtractError};

use crate::dto::ErrorResponse;

/// Wrapper so we can implement `IntoResponse` for `ExtractError`.
pub struct ApiError(pub ExtractError);

impl From<ExtractError> for ApiError {
    fn from(err: ExtractError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.kind() {
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::NoMatchFound => StatusCode::NOT_FOUND,
            ErrorKind::BrowserLaunchError
            | ErrorKind::PageCreationError
            | ErrorKind::RequestInterceptionError
            | ErrorKind::NavigationError
            | ErrorKind::UrlProcessingError => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ErrorResponse::from(&self.0);

        (status, axum::Json(body)).into_response()
    }
}
