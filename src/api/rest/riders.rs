use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post, put};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{AuthUser, RequireRider};
use crate::engine::claim::{available_orders, claim_order, AvailableOrder};
use crate::engine::location::{record_position, PositionUpdate};
use crate::engine::progression::{mark_delivered, mark_undeliverable, start_delivery};
use crate::error::AppError;
use crate::models::order::Order;
use crate::models::rider::{GeoPoint, Rider};
use crate::state::AppState;

const STALE_MESSAGE: &str = "order changed; reload and try again";

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/riders", post(register))
        .route("/riders/me", get(me))
        .route("/riders/me/online", patch(set_online))
        .route("/riders/me/orders/available", get(available))
        .route("/riders/me/location", put(update_location))
        .route("/orders/:id/claim", post(claim))
        .route("/orders/:id/start", post(start))
        .route("/orders/:id/deliver", post(deliver))
        .route("/orders/:id/fail", post(fail))
}

#[derive(Deserialize)]
pub struct RegisterRiderRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct OnlineRequest {
    pub online: bool,
}

async fn register(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(payload): Json<RegisterRiderRequest>,
) -> Result<Json<Rider>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }

    state.riders.register(user.user_id, &payload.name).map(Json)
}

async fn me(RequireRider { rider, .. }: RequireRider) -> Json<Rider> {
    Json(rider)
}

async fn set_online(
    State(state): State<Arc<AppState>>,
    RequireRider { rider, .. }: RequireRider,
    Json(payload): Json<OnlineRequest>,
) -> Result<Json<Rider>, AppError> {
    state.riders.set_online(&rider.id, payload.online).map(Json)
}

async fn available(
    State(state): State<Arc<AppState>>,
    RequireRider { rider, .. }: RequireRider,
) -> Json<Vec<AvailableOrder>> {
    Json(available_orders(&state, rider.id))
}

async fn update_location(
    State(state): State<Arc<AppState>>,
    RequireRider { rider, .. }: RequireRider,
    Json(position): Json<GeoPoint>,
) -> Result<Json<PositionUpdate>, AppError> {
    record_position(&state, rider.id, position).map(Json)
}

async fn claim(
    State(state): State<Arc<AppState>>,
    RequireRider { rider, .. }: RequireRider,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    claim_order(&state, rider.id, id)?
        .into_applied("order no longer available")
        .map(Json)
}

async fn start(
    State(state): State<Arc<AppState>>,
    RequireRider { rider, .. }: RequireRider,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    start_delivery(&state, rider.id, id)?
        .into_applied(STALE_MESSAGE)
        .map(Json)
}

async fn deliver(
    State(state): State<Arc<AppState>>,
    RequireRider { rider, .. }: RequireRider,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    mark_delivered(&state, rider.id, id)?
        .into_applied(STALE_MESSAGE)
        .map(Json)
}

async fn fail(
    State(state): State<Arc<AppState>>,
    RequireRider { rider, .. }: RequireRider,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    mark_undeliverable(&state, rider.id, id)?
        .into_applied(STALE_MESSAGE)
        .map(Json)
}
