use anyhow::Context;
use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use diesel::{ExpressionMethods, QueryDsl, QueryResult, SelectableHelper};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    aliases::DieselError,
    app_error::{AppError, StdResponse},
    app_state::AppState,
    models::{MenuItemEntity, OrderEntity, OrderItemEntity},
    schema::{menu_items, order_items, orders},
    status::OrderStatus,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(track_order))
            .routes(utoipa_axum::routes!(order_status)),
    )
}

async fn find_order(
    conn: &mut AsyncPgConnection,
    order_number: &str,
) -> Result<OrderEntity, AppError> {
    let order: QueryResult<OrderEntity> = orders::table
        .filter(orders::order_number.eq(order_number))
        .select(OrderEntity::as_select())
        .first(conn)
        .await;

    match order {
        Ok(order) => Ok(order),
        Err(DieselError::NotFound) => Err(AppError::NotFound),
        Err(err) => Err(AppError::Other(err.into())),
    }
}

#[derive(Serialize, ToSchema)]
struct OrderLineRes {
    name: String,
    quantity: i32,
    price_at_time: Decimal,
    subtotal: Decimal,
}

#[derive(Serialize, ToSchema)]
struct TrackOrderRes {
    order: OrderEntity,
    items: Vec<OrderLineRes>,
    progress_percent: u8,
}

/// Everything the tracking page needs for one order.
#[utoipa::path(
    get,
    path = "/{order_number}",
    tags = ["Orders"],
    params(
        ("order_number" = String, Path, description = "Order number to track")
    ),
    responses(
        (status = 200, description = "Order with its snapshotted lines", body = StdResponse<TrackOrderRes, String>)
    )
)]
async fn track_order(
    Path(order_number): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order = find_order(conn, &order_number).await?;

    let lines: Vec<(OrderItemEntity, MenuItemEntity)> = order_items::table
        .inner_join(menu_items::table)
        .filter(order_items::order_id.eq(order.id))
        .select((OrderItemEntity::as_select(), MenuItemEntity::as_select()))
        .get_results(conn)
        .await
        .context("Failed to get order items")?;

    let items = lines
        .into_iter()
        .map(|(item, menu_item)| OrderLineRes {
            name: menu_item.name,
            quantity: item.quantity,
            price_at_time: item.price_at_time,
            subtotal: item.price_at_time * Decimal::from(item.quantity),
        })
        .collect();

    // An unrecognized stored status renders as an empty bar rather than
    // failing the page.
    let progress_percent = OrderStatus::parse(&order.status)
        .map(|status| status.progress_percent())
        .unwrap_or(0);

    Ok(StdResponse {
        data: Some(TrackOrderRes {
            order,
            items,
            progress_percent,
        }),
        message: Some("Get order successfully"),
    })
}

#[derive(Serialize, ToSchema)]
struct OrderStatusRes {
    order_number: String,
    status: String,
    status_display: String,
    updated_at: DateTime<Utc>,
}

/// Cheap status poll for the tracking page.
#[utoipa::path(
    get,
    path = "/{order_number}/status",
    tags = ["Orders"],
    params(
        ("order_number" = String, Path, description = "Order number to poll")
    ),
    responses(
        (status = 200, description = "Current fulfillment status", body = OrderStatusRes)
    )
)]
async fn order_status(
    Path(order_number): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order = find_order(conn, &order_number).await?;

    let status_display = OrderStatus::parse(&order.status)
        .map(|status| status.display_name().to_string())
        .unwrap_or_else(|| order.status.clone());

    Ok(Json(OrderStatusRes {
        order_number: order.order_number,
        status: order.status,
        status_display,
        updated_at: order.updated_at,
    }))
}
