use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Vetrina API",
        version = "0.2.0",
        description = "Product-image extraction: one product-page URL in, the best representative image URL out."
    ),
    paths(crate::routes::extract, crate::routes::health),
    components(schemas(
        crate::dto::ExtractRequest,
        crate::dto::ExtractResponse,
        crate::dto::ErrorResponse,
        crate::dto::TriedRule,
        crate::dto::HealthResponse,
    )),
    tags(
        (name = "extract", description = "Image extraction"),
        (name = "system", description = "Health and system status"),
    )
)]
pub struct ApiDoc;
