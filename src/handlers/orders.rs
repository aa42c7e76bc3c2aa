//! Order lookup endpoints for the authenticated customer.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::models::Order;
use crate::AppState;

pub fn orders_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders))
        .route("/:id", get(get_order))
}

/// List the caller's orders, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    responses(
        (status = 200, description = "The caller's orders", body = [Order]),
        (status = 401, description = "Missing or invalid credentials", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Order>>, ServiceError> {
    let orders = state.orders.list_for_user(&user.user_id).await?;
    Ok(Json(orders))
}

async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, ServiceError> {
    // Ownership gates visibility; an order belonging to someone else is
    // indistinguishable from a missing one.
    let order = state
        .orders
        .get(id)
        .await?
        .filter(|order| order.user_id == user.user_id)
        .ok_or_else(|| ServiceError::NotFound(format!("Order {id} not found")))?;
    Ok(Json(order))
}
