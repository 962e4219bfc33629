use anyhow::Result;
use axum::Router;
use utoipa::openapi::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Serves the interactive API docs at `/swagger-ui`.
pub fn create_swagger_ui<S>(openapi: OpenApi) -> Result<Router<S>>
where
    S: Clone + Send + Sync + 'static,
{
    Ok(SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", openapi)
        .into())
}
