use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    Json,
    response::IntoResponse,
};
use diesel::{ExpressionMethods, QueryDsl, QueryResult, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    aliases::DieselError,
    app_error::{AppError, StdResponse},
    app_state::AppState,
    models::OrderEntity,
    schema::orders,
    status::OrderStatus,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/staff/orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(list_orders))
            .routes(utoipa_axum::routes!(set_order_status)),
    )
}

#[derive(Deserialize, IntoParams)]
struct ListOrdersQuery {
    /// Restrict the listing to one workflow status.
    status: Option<String>,
}

/// All orders, newest first.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Staff"],
    params(ListOrdersQuery),
    responses(
        (status = 200, description = "Orders newest-first", body = StdResponse<Vec<OrderEntity>, String>)
    )
)]
async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let mut db_query = orders::table
        .select(OrderEntity::as_select())
        .order_by(orders::created_at.desc())
        .into_boxed();

    if let Some(raw) = query.status.as_deref() {
        let status = OrderStatus::parse(raw)
            .ok_or_else(|| AppError::Validation(format!("{raw} is not a valid order status")))?;
        db_query = db_query.filter(orders::status.eq(status.as_str()));
    }

    let listing: Vec<OrderEntity> = db_query
        .get_results(conn)
        .await
        .context("Failed to get orders")?;

    Ok(StdResponse {
        data: Some(listing),
        message: Some("Get orders successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct SetStatusReq {
    status: String,
}

/// Move an order through the fulfillment workflow.
#[utoipa::path(
    patch,
    path = "/{order_number}/status",
    tags = ["Staff"],
    params(
        ("order_number" = String, Path, description = "Order to update")
    ),
    request_body = SetStatusReq,
    responses(
        (status = 200, description = "Order status updated", body = StdResponse<OrderEntity, String>)
    )
)]
async fn set_order_status(
    Path(order_number): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<SetStatusReq>,
) -> Result<impl IntoResponse, AppError> {
    let status = OrderStatus::parse(&body.status)
        .ok_or_else(|| AppError::Validation(format!("{} is not a valid order status", body.status)))?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let updated: QueryResult<OrderEntity> =
        diesel::update(orders::table.filter(orders::order_number.eq(&order_number)))
            .set(orders::status.eq(status.as_str()))
            .returning(OrderEntity::as_returning())
            .get_result(conn)
            .await;

    match updated {
        Ok(order) => {
            tracing::info!(order_number = %order.order_number, status = %order.status, "order status updated");
            Ok(StdResponse {
                data: Some(order),
                message: Some("Order status updated"),
            })
        }
        Err(DieselError::NotFound) => Err(AppError::NotFound),
        Err(err) => Err(AppError::Other(err.into())),
    }
}
