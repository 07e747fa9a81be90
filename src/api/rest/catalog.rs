use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::models::catalog::{Address, Pack, Zone};
use crate::models::rider::GeoPoint;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/packs", get(packs))
        .route("/zones", get(zones))
        .route("/addresses", get(my_addresses).post(add_address))
}

#[derive(Deserialize)]
pub struct NewAddress {
    pub zone_id: Uuid,
    #[serde(default)]
    pub label: String,
    pub line: String,
    pub location: GeoPoint,
}

async fn packs(State(state): State<Arc<AppState>>) -> Json<Vec<Pack>> {
    Json(state.catalog.packs())
}

async fn zones(State(state): State<Arc<AppState>>) -> Json<Vec<Zone>> {
    Json(state.catalog.zones())
}

async fn my_addresses(State(state): State<Arc<AppState>>, user: AuthUser) -> Json<Vec<Address>> {
    Json(state.catalog.addresses_for(&user.user_id))
}

async fn add_address(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(payload): Json<NewAddress>,
) -> Result<Json<Address>, AppError> {
    state
        .catalog
        .add_address(
            user.user_id,
            payload.zone_id,
            &payload.label,
            &payload.line,
            payload.location,
        )
        .map(Json)
}
