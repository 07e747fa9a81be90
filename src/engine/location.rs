use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::engine::orders::customer_order;
use crate::error::AppError;
use crate::models::order::{Order, OrderStatus};
use crate::models::rider::{GeoPoint, RiderLocation};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PositionUpdate {
    Recorded { location: RiderLocation },
    SamplingStopped { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackingView {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub rider_id: Option<Uuid>,
    pub eta_minutes: Option<u32>,
    pub location: Option<RiderLocation>,
    pub keep_polling: bool,
    pub poll_interval_secs: u64,
}

/// Upserts the rider's current position while they are online and carrying an
/// en-route order. Any other state tells the rider client to stop sampling.
pub fn record_position(state: &AppState, rider_id: Uuid, position: GeoPoint) -> Result<PositionUpdate, AppError> {
    if !position.is_valid() {
        return Err(AppError::Validation("coordinates out of range".to_string()));
    }

    if let Some(reason) = sampling_gate(state, rider_id)? {
        return Ok(PositionUpdate::SamplingStopped { reason });
    }

    let location = state.riders.upsert_location(rider_id, position);
    debug!(rider_id = %rider_id, "rider position recorded");
    Ok(PositionUpdate::Recorded { location })
}

/// `None` while sampling is allowed, otherwise the reason it must stop.
pub fn sampling_gate(state: &AppState, rider_id: Uuid) -> Result<Option<String>, AppError> {
    let rider = state
        .riders
        .get(&rider_id)
        .ok_or_else(|| AppError::NotFound(format!("rider {rider_id} not found")))?;

    if !rider.is_online {
        return Ok(Some("rider is offline".to_string()));
    }

    let en_route = rider
        .active_order_id
        .and_then(|order_id| state.orders.get(&order_id))
        .is_some_and(|order| {
            order.status == OrderStatus::EnRoute && order.rider_id == Some(rider_id)
        });

    if !en_route {
        return Ok(Some("no order en route".to_string()));
    }

    Ok(None)
}

/// Customer view of an order's rider. Polling ends once the order is terminal.
pub fn track_order(state: &AppState, customer_id: Uuid, order_id: Uuid) -> Result<TrackingView, AppError> {
    let order = customer_order(state, customer_id, order_id)?;
    Ok(tracking_view(state, &order))
}

pub fn tracking_view(state: &AppState, order: &Order) -> TrackingView {
    let keep_polling = !order.status.is_terminal();
    let location = order
        .rider_id
        .filter(|_| keep_polling)
        .and_then(|rider_id| state.riders.location(&rider_id));

    TrackingView {
        order_id: order.id,
        status: order.status,
        rider_id: order.rider_id,
        eta_minutes: order.eta_minutes,
        location,
        keep_polling,
        poll_interval_secs: state.config.location_interval_secs,
    }
}
