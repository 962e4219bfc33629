use anyhow::Context;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    catalog,
    models::MenuItemEntity,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/menu",
        OpenApiRouter::new().routes(utoipa_axum::routes!(get_menu)),
    )
}

#[derive(Deserialize, IntoParams)]
struct MenuQuery {
    /// Case-insensitive substring match on item name or description.
    search: Option<String>,
}

#[derive(Serialize, ToSchema)]
struct MenuCategoryRes {
    category: String,
    items: Vec<MenuItemEntity>,
}

/// The available menu, grouped by category.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Menu"],
    params(MenuQuery),
    responses(
        (status = 200, description = "Available menu items grouped by category", body = StdResponse<Vec<MenuCategoryRes>, String>)
    )
)]
async fn get_menu(
    State(state): State<AppState>,
    Query(query): Query<MenuQuery>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let items = catalog::available_items(conn, query.search.as_deref()).await?;

    // Items arrive ordered by category, so grouping is a single pass.
    let mut categories: Vec<MenuCategoryRes> = Vec::new();
    for item in items {
        match categories.last_mut() {
            Some(last) if last.category == item.category => last.items.push(item),
            _ => categories.push(MenuCategoryRes {
                category: item.category.clone(),
                items: vec![item],
            }),
        }
    }

    Ok(StdResponse {
        data: Some(categories),
        message: Some("Get menu successfully"),
    })
}
