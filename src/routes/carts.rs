use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, QueryDsl, QueryResult, SelectableHelper, upsert::excluded};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    aliases::DieselError,
    app_error::AppError,
    app_state::AppState,
    catalog,
    middleware::{self, SessionKey},
    models::{CartEntity, CartItemEntity, CreateCartEntity, CreateCartItemEntity, MenuItemEntity},
    schema::{cart_items, carts, menu_items},
};

/// One cart line joined with its menu item, live-priced.
pub type CartLine = (CartItemEntity, MenuItemEntity);

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/cart",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_cart))
            .routes(utoipa_axum::routes!(add_cart_item))
            .routes(utoipa_axum::routes!(update_cart_item, remove_cart_item))
            .route_layer(axum::middleware::from_fn(middleware::session_key)),
    )
}

/// Race-safe get-or-create keyed by session. A lost insert race falls
/// through to the select.
pub async fn get_or_create_cart(
    conn: &mut AsyncPgConnection,
    session_key: &str,
) -> Result<CartEntity, AppError> {
    diesel::insert_into(carts::table)
        .values(CreateCartEntity {
            session_key: session_key.to_string(),
        })
        .on_conflict(carts::session_key)
        .do_nothing()
        .execute(conn)
        .await
        .context("Failed to create cart")?;

    let cart = carts::table
        .filter(carts::session_key.eq(session_key))
        .select(CartEntity::as_select())
        .first(conn)
        .await
        .context("Failed to load cart")?;

    Ok(cart)
}

pub async fn cart_lines(
    conn: &mut AsyncPgConnection,
    cart_id: i32,
) -> Result<Vec<CartLine>, AppError> {
    let lines = cart_items::table
        .inner_join(menu_items::table)
        .filter(cart_items::cart_id.eq(cart_id))
        .select((CartItemEntity::as_select(), MenuItemEntity::as_select()))
        .order_by(cart_items::added_at.asc())
        .get_results(conn)
        .await
        .context("Failed to get cart items")?;

    Ok(lines)
}

pub struct CartTotals {
    pub item_count: i64,
    pub total_amount: Decimal,
}

/// Live cart totals: quantities summed and every line priced at the menu's
/// current price.
pub fn summarize(lines: &[CartLine]) -> CartTotals {
    let item_count: i64 = lines
        .iter()
        .map(|(item, _)| i64::from(item.quantity))
        .sum();
    let total_amount: Decimal = lines
        .iter()
        .map(|(item, menu_item)| menu_item.price * Decimal::from(item.quantity))
        .sum();

    CartTotals {
        item_count,
        total_amount,
    }
}

async fn touch_cart(conn: &mut AsyncPgConnection, cart_id: i32) -> Result<(), AppError> {
    diesel::update(carts::table.find(cart_id))
        .set(carts::updated_at.eq(diesel::dsl::now))
        .execute(conn)
        .await
        .context("Failed to update cart timestamp")?;
    Ok(())
}

#[derive(Serialize, ToSchema)]
struct CartLineRes {
    id: i32,
    menu_item_id: i32,
    name: String,
    price: Decimal,
    quantity: i32,
    subtotal: Decimal,
}

#[derive(Serialize, ToSchema)]
struct GetCartRes {
    cart: CartEntity,
    items: Vec<CartLineRes>,
    item_count: i64,
    total_amount: Decimal,
}

/// Fetch the session's cart, creating an empty one on first access.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Cart"],
    responses(
        (status = 200, description = "The session's cart with live-priced lines", body = GetCartRes)
    )
)]
async fn get_cart(
    State(state): State<AppState>,
    Extension(SessionKey(session_key)): Extension<SessionKey>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let cart = get_or_create_cart(conn, &session_key).await?;
    let lines = cart_lines(conn, cart.id).await?;
    let totals = summarize(&lines);

    let items = lines
        .into_iter()
        .map(|(item, menu_item)| {
            let subtotal = menu_item.price * Decimal::from(item.quantity);
            CartLineRes {
                id: item.id,
                menu_item_id: menu_item.id,
                name: menu_item.name,
                price: menu_item.price,
                quantity: item.quantity,
                subtotal,
            }
        })
        .collect();

    Ok(Json(GetCartRes {
        cart,
        items,
        item_count: totals.item_count,
        total_amount: totals.total_amount,
    }))
}

#[derive(Deserialize, ToSchema)]
struct AddCartItemReq {
    menu_item_id: i32,
    quantity: i32,
}

#[derive(Serialize, ToSchema)]
struct CartMutationRes {
    success: bool,
    message: String,
    cart_count: i64,
    cart_total: Decimal,
}

/// Add a menu item to the session's cart. Adding an item that is already in
/// the cart increments its quantity instead of duplicating the line.
#[utoipa::path(
    post,
    path = "/items",
    tags = ["Cart"],
    request_body = AddCartItemReq,
    responses(
        (status = 200, description = "Item added to the cart", body = CartMutationRes)
    )
)]
async fn add_cart_item(
    State(state): State<AppState>,
    Extension(SessionKey(session_key)): Extension<SessionKey>,
    Json(body): Json<AddCartItemReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.quantity < 1 {
        return Err(AppError::Validation(
            "Quantity must be at least 1".to_string(),
        ));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let menu_item = catalog::available_item(conn, body.menu_item_id).await?;
    let cart = get_or_create_cart(conn, &session_key).await?;

    // Atomic increment, so concurrent adds from duplicate tabs cannot lose
    // an update between read and write.
    diesel::insert_into(cart_items::table)
        .values(CreateCartItemEntity {
            cart_id: cart.id,
            menu_item_id: menu_item.id,
            quantity: body.quantity,
        })
        .on_conflict((cart_items::cart_id, cart_items::menu_item_id))
        .do_update()
        .set(cart_items::quantity.eq(cart_items::quantity + excluded(cart_items::quantity)))
        .execute(conn)
        .await
        .context("Failed to upsert cart item")?;

    touch_cart(conn, cart.id).await?;

    let totals = summarize(&cart_lines(conn, cart.id).await?);
    Ok(Json(CartMutationRes {
        success: true,
        message: format!("{} added to cart", menu_item.name),
        cart_count: totals.item_count,
        cart_total: totals.total_amount,
    }))
}

#[derive(Deserialize, ToSchema)]
struct UpdateCartItemReq {
    quantity: i32,
}

#[derive(Serialize, ToSchema)]
struct UpdateCartItemRes {
    success: bool,
    message: String,
    cart_count: i64,
    cart_total: Decimal,
    item_subtotal: Decimal,
}

/// Set a cart line's quantity. Zero or negative quantities remove the line.
#[utoipa::path(
    post,
    path = "/items/{id}",
    tags = ["Cart"],
    params(
        ("id" = i32, Path, description = "Cart line to update")
    ),
    request_body = UpdateCartItemReq,
    responses(
        (status = 200, description = "Cart updated", body = UpdateCartItemRes)
    )
)]
async fn update_cart_item(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(SessionKey(session_key)): Extension<SessionKey>,
    Json(body): Json<UpdateCartItemReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let cart = get_or_create_cart(conn, &session_key).await?;

    if body.quantity <= 0 {
        // Zero and negative quantities mean removal, not an error.
        let deleted = diesel::delete(
            cart_items::table
                .filter(cart_items::id.eq(id))
                .filter(cart_items::cart_id.eq(cart.id)),
        )
        .execute(conn)
        .await
        .context("Failed to delete cart item")?;

        if deleted == 0 {
            return Err(AppError::NotFound);
        }

        touch_cart(conn, cart.id).await?;
        let totals = summarize(&cart_lines(conn, cart.id).await?);
        return Ok(Json(UpdateCartItemRes {
            success: true,
            message: "Item removed from cart".to_string(),
            cart_count: totals.item_count,
            cart_total: totals.total_amount,
            item_subtotal: Decimal::ZERO,
        }));
    }

    let updated: QueryResult<CartItemEntity> = diesel::update(
        cart_items::table
            .filter(cart_items::id.eq(id))
            .filter(cart_items::cart_id.eq(cart.id)),
    )
    .set(cart_items::quantity.eq(body.quantity))
    .returning(CartItemEntity::as_returning())
    .get_result(conn)
    .await;

    let item = match updated {
        Ok(item) => item,
        Err(DieselError::NotFound) => return Err(AppError::NotFound),
        Err(err) => return Err(AppError::Other(err.into())),
    };

    let price: Decimal = menu_items::table
        .find(item.menu_item_id)
        .select(menu_items::price)
        .first(conn)
        .await
        .context("Failed to get menu item price")?;

    touch_cart(conn, cart.id).await?;
    let totals = summarize(&cart_lines(conn, cart.id).await?);
    Ok(Json(UpdateCartItemRes {
        success: true,
        message: "Cart updated".to_string(),
        cart_count: totals.item_count,
        cart_total: totals.total_amount,
        item_subtotal: price * Decimal::from(item.quantity),
    }))
}

/// Remove a line from the session's cart.
#[utoipa::path(
    delete,
    path = "/items/{id}",
    tags = ["Cart"],
    params(
        ("id" = i32, Path, description = "Cart line to remove")
    ),
    responses(
        (status = 200, description = "Item removed from the cart", body = CartMutationRes)
    )
)]
async fn remove_cart_item(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(SessionKey(session_key)): Extension<SessionKey>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let cart = get_or_create_cart(conn, &session_key).await?;

    let deleted = diesel::delete(
        cart_items::table
            .filter(cart_items::id.eq(id))
            .filter(cart_items::cart_id.eq(cart.id)),
    )
    .execute(conn)
    .await
    .context("Failed to delete cart item")?;

    if deleted == 0 {
        return Err(AppError::NotFound);
    }

    touch_cart(conn, cart.id).await?;

    let totals = summarize(&cart_lines(conn, cart.id).await?);
    Ok(Json(CartMutationRes {
        success: true,
        message: "Item removed from cart".to_string(),
        cart_count: totals.item_count,
        cart_total: totals.total_amount,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn menu_item(id: i32, price: Decimal) -> MenuItemEntity {
        MenuItemEntity {
            id,
            name: format!("Item {id}"),
            description: None,
            price,
            category: "Main Course".to_string(),
            is_available: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn line(id: i32, menu_item_id: i32, quantity: i32, price: Decimal) -> CartLine {
        (
            CartItemEntity {
                id,
                cart_id: 1,
                menu_item_id,
                quantity,
                added_at: Utc::now(),
            },
            menu_item(menu_item_id, price),
        )
    }

    #[test]
    fn an_empty_cart_sums_to_zero() {
        let totals = summarize(&[]);
        assert_eq!(totals.item_count, 0);
        assert_eq!(totals.total_amount, Decimal::ZERO);
    }

    #[test]
    fn totals_sum_quantities_and_price_times_quantity() {
        let lines = vec![
            line(1, 10, 2, Decimal::new(899, 2)),
            line(2, 11, 3, Decimal::new(1650, 2)),
        ];
        let totals = summarize(&lines);
        assert_eq!(totals.item_count, 5);
        // 2 * 8.99 + 3 * 16.50 = 67.48
        assert_eq!(totals.total_amount, Decimal::new(6748, 2));
    }

    #[test]
    fn totals_follow_the_menu_price_not_a_stored_one() {
        let mut lines = vec![line(1, 10, 2, Decimal::new(500, 2))];
        assert_eq!(summarize(&lines).total_amount, Decimal::new(1000, 2));

        // A price change while the item sits in the cart moves the total.
        lines[0].1.price = Decimal::new(700, 2);
        assert_eq!(summarize(&lines).total_amount, Decimal::new(1400, 2));
    }
}
