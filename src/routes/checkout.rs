use anyhow::Context;
use axum::{
    Extension, Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use diesel::{
    ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper,
    result::DatabaseErrorKind,
};
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    aliases::DieselError,
    app_error::AppError,
    app_state::AppState,
    middleware::{self, SessionKey},
    models::{
        CartEntity, CartItemEntity, CreateOrderEntity, CreateOrderItemEntity, MenuItemEntity,
        OrderEntity,
    },
    order_number,
    routes::carts::{CartLine, summarize},
    schema::{cart_items, carts, menu_items, order_items, orders},
    status::{OrderStatus, OrderType},
};

const ORDER_NUMBER_ATTEMPTS: usize = 5;

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/checkout",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(checkout))
            .route_layer(axum::middleware::from_fn(middleware::session_key)),
    )
}

#[derive(Deserialize, ToSchema)]
pub struct CheckoutReq {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub order_type: String,
    pub table_number: Option<i32>,
    pub notes: Option<String>,
}

impl CheckoutReq {
    /// Field checks that need no database access.
    fn validate(&self) -> Result<OrderType, AppError> {
        if self.customer_name.trim().is_empty() {
            return Err(AppError::Validation(
                "Customer name is required".to_string(),
            ));
        }
        if self.customer_email.trim().is_empty() || !self.customer_email.contains('@') {
            return Err(AppError::Validation(
                "A valid email address is required".to_string(),
            ));
        }
        if self.customer_phone.trim().is_empty() {
            return Err(AppError::Validation(
                "Customer phone is required".to_string(),
            ));
        }
        OrderType::parse(self.order_type.trim()).ok_or_else(|| {
            AppError::Validation(format!("{} is not a valid order type", self.order_type))
        })
    }
}

#[derive(Serialize, ToSchema)]
struct CheckoutRes {
    success: bool,
    message: String,
    order_number: String,
}

/// Convert the session's cart into a persisted order: snapshot prices,
/// create the order and its items, drop the cart. All-or-nothing.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Checkout"],
    request_body = CheckoutReq,
    responses(
        (status = 201, description = "Order placed; Location points at the tracking resource", body = CheckoutRes)
    )
)]
async fn checkout(
    State(state): State<AppState>,
    Extension(SessionKey(session_key)): Extension<SessionKey>,
    Json(body): Json<CheckoutReq>,
) -> Result<impl IntoResponse, AppError> {
    let order_type = body.validate()?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order = conn
        .transaction(move |conn| {
            Box::pin(async move {
                // Lock the cart row so a concurrent checkout of the same
                // session serializes behind this one and then finds no cart.
                let cart: Option<CartEntity> = carts::table
                    .filter(carts::session_key.eq(&session_key))
                    .select(CartEntity::as_select())
                    .for_update()
                    .first(conn)
                    .await
                    .optional()
                    .context("Failed to lock cart")?;

                let Some(cart) = cart else {
                    return Err(AppError::Validation("Your cart is empty".to_string()));
                };

                let lines: Vec<CartLine> = cart_items::table
                    .inner_join(menu_items::table)
                    .filter(cart_items::cart_id.eq(cart.id))
                    .select((CartItemEntity::as_select(), MenuItemEntity::as_select()))
                    .get_results(conn)
                    .await
                    .context("Failed to get cart items")?;

                if lines.is_empty() {
                    return Err(AppError::Validation("Your cart is empty".to_string()));
                }

                let total_amount = summarize(&lines).total_amount;
                let order =
                    insert_order_with_fresh_number(conn, &body, order_type, total_amount).await?;

                diesel::insert_into(order_items::table)
                    .values(snapshot_items(order.id, &lines))
                    .execute(conn)
                    .await
                    .context("Failed to create order items")?;

                diesel::delete(carts::table.find(cart.id))
                    .execute(conn)
                    .await
                    .context("Failed to clear cart")?;

                Ok::<OrderEntity, AppError>(order)
            })
        })
        .await?;

    tracing::info!(order_number = %order.order_number, "order placed");

    let location = format!("/orders/{}", order.order_number);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(CheckoutRes {
            success: true,
            message: "Order placed successfully".to_string(),
            order_number: order.order_number,
        }),
    ))
}

/// Inserts the order, retrying with a fresh candidate when the generated
/// number collides with an existing one. Each attempt runs in a savepoint so
/// a conflict does not poison the surrounding transaction.
async fn insert_order_with_fresh_number(
    conn: &mut AsyncPgConnection,
    req: &CheckoutReq,
    order_type: OrderType,
    total_amount: Decimal,
) -> Result<OrderEntity, AppError> {
    for _ in 0..ORDER_NUMBER_ATTEMPTS {
        let row = CreateOrderEntity {
            order_number: order_number::candidate(),
            customer_name: req.customer_name.trim().to_string(),
            customer_email: req.customer_email.trim().to_string(),
            customer_phone: req.customer_phone.trim().to_string(),
            order_type: order_type.as_str().to_string(),
            table_number: req.table_number,
            status: OrderStatus::Pending.as_str().to_string(),
            total_amount,
            notes: req
                .notes
                .clone()
                .filter(|notes| !notes.trim().is_empty()),
        };

        let attempt = conn
            .transaction(move |conn| {
                Box::pin(async move {
                    diesel::insert_into(orders::table)
                        .values(row)
                        .returning(OrderEntity::as_returning())
                        .get_result(conn)
                        .await
                })
            })
            .await;

        match attempt {
            Ok(order) => return Ok(order),
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => continue,
            Err(err) => return Err(AppError::Other(err.into())),
        }
    }

    Err(AppError::Other(anyhow::anyhow!(
        "could not allocate a unique order number after {ORDER_NUMBER_ATTEMPTS} attempts"
    )))
}

/// One order line per cart line, with the menu's current price frozen in.
fn snapshot_items(order_id: i32, lines: &[CartLine]) -> Vec<CreateOrderItemEntity> {
    lines
        .iter()
        .map(|(item, menu_item)| CreateOrderItemEntity {
            order_id,
            menu_item_id: menu_item.id,
            quantity: item.quantity,
            price_at_time: menu_item.price,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn req() -> CheckoutReq {
        CheckoutReq {
            customer_name: "Ada Lovelace".to_string(),
            customer_email: "ada@example.com".to_string(),
            customer_phone: "555-0100".to_string(),
            order_type: "dine_in".to_string(),
            table_number: Some(4),
            notes: None,
        }
    }

    fn line(menu_item_id: i32, quantity: i32, price: Decimal) -> CartLine {
        (
            CartItemEntity {
                id: menu_item_id,
                cart_id: 1,
                menu_item_id,
                quantity,
                added_at: Utc::now(),
            },
            MenuItemEntity {
                id: menu_item_id,
                name: format!("Item {menu_item_id}"),
                description: None,
                price,
                category: "Main Course".to_string(),
                is_available: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        )
    }

    #[test]
    fn a_complete_request_passes_validation() {
        assert_eq!(req().validate().unwrap(), OrderType::DineIn);
    }

    #[test]
    fn blank_customer_fields_are_rejected() {
        let mut bad = req();
        bad.customer_name = "   ".to_string();
        assert!(matches!(bad.validate(), Err(AppError::Validation(_))));

        let mut bad = req();
        bad.customer_phone = String::new();
        assert!(matches!(bad.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn an_email_without_an_at_sign_is_rejected() {
        let mut bad = req();
        bad.customer_email = "ada.example.com".to_string();
        assert!(matches!(bad.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn unknown_order_types_are_rejected() {
        let mut bad = req();
        bad.order_type = "delivery".to_string();
        assert!(matches!(bad.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn snapshots_freeze_the_current_price_per_line() {
        let lines = vec![
            line(10, 2, Decimal::new(899, 2)),
            line(11, 1, Decimal::new(2299, 2)),
        ];
        let rows = snapshot_items(7, &lines);

        assert_eq!(rows.len(), lines.len());
        for (row, (item, menu_item)) in rows.iter().zip(&lines) {
            assert_eq!(row.order_id, 7);
            assert_eq!(row.menu_item_id, menu_item.id);
            assert_eq!(row.quantity, item.quantity);
            assert_eq!(row.price_at_time, menu_item.price);
        }
    }

    #[test]
    fn later_menu_price_changes_do_not_move_the_snapshot() {
        let mut lines = vec![line(10, 3, Decimal::new(500, 2))];
        let rows = snapshot_items(1, &lines);

        lines[0].1.price = Decimal::new(999, 2);
        assert_eq!(rows[0].price_at_time, Decimal::new(500, 2));
    }
}
