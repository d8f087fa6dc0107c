use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use vetrina_core::error::ExtractError;
use vetrina_core::page::Renderer;

use crate::dto::{ExtractRequest, ExtractResponse, HealthResponse};
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Build the full router with all routes.
pub fn router<R>(state: Arc<AppState<R>>) -> Router
where
    R: Renderer + 'static,
{
    Router::new()
        .route("/v1/extract", post(extract::<R>))
        .route("/health", get(health::<R>))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Extract
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/v1/extract",
    request_body = ExtractRequest,
    responses(
        (status = 200, description = "Image extracted", body = ExtractResponse),
        (status = 400, description = "Malformed request", body = crate::dto::ErrorResponse),
        (status = 404, description = "No rule matched", body = crate::dto::ErrorResponse),
        (status = 500, description = "Pipeline failure", body = crate::dto::ErrorResponse),
    ),
    tag = "extract"
)]
pub async fn extract<R: Renderer>(
    State(state): State<Arc<AppState<R>>>,
    body: Result<axum::Json<ExtractRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    // A missing or malformed body is an invalid_input failure, not a bare
    // extractor rejection; the error envelope is part of the contract.
    let axum::Json(body) =
        body.map_err(|rejection| ApiError(ExtractError::InvalidInput(rejection.body_text())))?;

    let result = state.service.extract(&body.url).await?;

    let response = ExtractResponse {
        image: result.image.to_string(),
        matched_rule: result.matched_rule,
    };

    Ok(axum::Json(response))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health<R: Renderer>(State(state): State<Arc<AppState<R>>>) -> impl IntoResponse {
    axum::Json(HealthResponse {
        status: "healthy",
        renderer: state.renderer_name.to_string(),
    })
}
