use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::RequireAdmin;
use crate::engine::admin::{export_delivered_csv, list_orders, mark_paid, refund};
use crate::error::AppError;
use crate::models::catalog::{Pack, Zone};
use crate::models::order::{Order, OrderStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/orders", get(orders))
        .route("/admin/orders/export.csv", get(export))
        .route("/admin/orders/:id/mark-paid", post(confirm_cash))
        .route("/admin/orders/:id/refund", post(refund_order))
        .route("/admin/packs", post(create_pack))
        .route("/admin/zones", post(create_zone))
}

#[derive(Deserialize)]
pub struct OrdersQuery {
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct NewPack {
    pub name: String,
    pub price_cents: i64,
}

#[derive(Deserialize)]
pub struct NewZone {
    pub name: String,
}

async fn orders(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Query(query): Query<OrdersQuery>,
) -> Result<Json<Vec<Order>>, AppError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<OrderStatus>)
        .transpose()
        .map_err(AppError::Validation)?;

    Ok(Json(list_orders(&state, status)))
}

async fn export(State(state): State<Arc<AppState>>, _admin: RequireAdmin) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"deliveries.csv\"",
            ),
        ],
        export_delivered_csv(&state),
    )
}

async fn confirm_cash(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    mark_paid(&state, id)?
        .into_applied("order is not awaiting payment")
        .map(Json)
}

async fn refund_order(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    refund(&state, id)?
        .into_applied("only paid orders that were cancelled or failed can be refunded")
        .map(Json)
}

async fn create_pack(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Json(payload): Json<NewPack>,
) -> Result<Json<Pack>, AppError> {
    state
        .catalog
        .add_pack(&payload.name, payload.price_cents)
        .map(Json)
}

async fn create_zone(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Json(payload): Json<NewZone>,
) -> Result<Json<Zone>, AppError> {
    state.catalog.add_zone(&payload.name).map(Json)
}
