use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::engine::location::{track_order, TrackingView};
use crate::engine::orders::{cancel_order, create_order, NewOrder};
use crate::error::AppError;
use crate::models::order::Order;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create).get(list_mine))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/cancel", post(cancel))
        .route("/orders/:id/tracking", get(tracking))
}

async fn create(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(payload): Json<NewOrder>,
) -> Result<Json<Order>, AppError> {
    create_order(&state, user.user_id, payload).map(Json)
}

async fn list_mine(State(state): State<Arc<AppState>>, user: AuthUser) -> Json<Vec<Order>> {
    Json(state.orders.list(|order| order.customer_id == user.user_id))
}

/// Readable by the customer who placed it and by the rider holding it.
async fn get_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .orders
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;

    let holds_it = order.rider_id.is_some_and(|rider_id| {
        state
            .riders
            .find_by_user(&user.user_id)
            .is_some_and(|rider| rider.id == rider_id)
    });

    if order.customer_id != user.user_id && !holds_it {
        return Err(AppError::Forbidden("not your order".to_string()));
    }

    Ok(Json(order))
}

async fn cancel(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let outcome = cancel_order(&state, user.user_id, id)?;
    outcome
        .into_applied("order can no longer be cancelled")
        .map(Json)
}

async fn tracking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<TrackingView>, AppError> {
    track_order(&state, user.user_id, id).map(Json)
}
