use anyhow::Context;
use diesel::{
    BoolExpressionMethods, ExpressionMethods, OptionalExtension, PgTextExpressionMethods, QueryDsl,
    SelectableHelper,
};
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::{app_error::AppError, models::MenuItemEntity, schema::menu_items};

/// Looks up a menu item on behalf of a cart mutation. A missing or
/// unavailable item is a validation failure of that mutation, not a 404.
pub async fn available_item(
    conn: &mut AsyncPgConnection,
    id: i32,
) -> Result<MenuItemEntity, AppError> {
    let item: Option<MenuItemEntity> = menu_items::table
        .find(id)
        .select(MenuItemEntity::as_select())
        .first(conn)
        .await
        .optional()
        .context("Failed to look up menu item")?;

    match item {
        None => Err(AppError::Validation(
            "Menu item does not exist".to_string(),
        )),
        Some(item) if !item.is_available => Err(AppError::Validation(format!(
            "{} is currently unavailable",
            item.name
        ))),
        Some(item) => Ok(item),
    }
}

/// Available menu items, optionally narrowed by a case-insensitive substring
/// match on name or description, ordered for category grouping.
pub async fn available_items(
    conn: &mut AsyncPgConnection,
    search: Option<&str>,
) -> Result<Vec<MenuItemEntity>, AppError> {
    let mut query = menu_items::table
        .filter(menu_items::is_available.eq(true))
        .select(MenuItemEntity::as_select())
        .order_by((menu_items::category.asc(), menu_items::name.asc()))
        .into_boxed();

    if let Some(term) = search.map(str::trim).filter(|term| !term.is_empty()) {
        let pattern = format!("%{term}%");
        query = query.filter(
            menu_items::name
                .ilike(pattern.clone())
                .or(menu_items::description.ilike(pattern)),
        );
    }

    let items = query
        .get_results(conn)
        .await
        .context("Failed to get menu items")?;
    Ok(items)
}
