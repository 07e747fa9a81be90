use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::haversine_km;
use crate::models::order::{Order, OrderStatus, PaymentStatus};
use crate::state::AppState;
use crate::store::orders::{Expect, UpdateOutcome};

#[derive(Debug, Clone, Serialize)]
pub struct AvailableOrder {
    pub order: Order,
    pub distance_km: Option<f64>,
}

/// Orders a rider could claim right now, nearest first when the rider's
/// position is known.
pub fn available_orders(state: &AppState, rider_id: Uuid) -> Vec<AvailableOrder> {
    let rider_position = state
        .riders
        .location(&rider_id)
        .map(|location| location.position);

    let mut available: Vec<AvailableOrder> = state
        .orders
        .list(|order| {
            order.status == OrderStatus::Pending
                && order.payment_status == PaymentStatus::Paid
                && order.rider_id.is_none()
        })
        .into_iter()
        .map(|order| {
            let distance_km = rider_position.zip(state.catalog.address(&order.address_id)).map(
                |(position, address)| haversine_km(&position, &address.location),
            );
            AvailableOrder { order, distance_km }
        })
        .collect();

    available.sort_by(|a, b| match (a.distance_km, b.distance_km) {
        (Some(left), Some(right)) => left.total_cmp(&right),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.order.created_at.cmp(&b.order.created_at),
    });

    available
}

/// Assigns a pending, paid, unassigned order to `rider_id`.
///
/// The rider profile stays locked across the order's conditional update, so
/// the rider's online and one-active-order checks are part of the same atomic
/// step as the claim itself. Losing a race yields `UpdateOutcome::Stale`.
pub fn claim_order(state: &AppState, rider_id: Uuid, order_id: Uuid) -> Result<UpdateOutcome, AppError> {
    let start = Instant::now();
    let result = try_claim(state, rider_id, order_id);

    let outcome_label = match &result {
        Ok(UpdateOutcome::Applied(_)) => "applied",
        Ok(UpdateOutcome::Stale(_)) => "stale",
        Err(_) => "rejected",
    };
    state
        .metrics
        .claim_latency_seconds
        .with_label_values(&[outcome_label])
        .observe(start.elapsed().as_secs_f64());
    state.metrics.transition("claim", outcome_label);

    result
}

fn try_claim(state: &AppState, rider_id: Uuid, order_id: Uuid) -> Result<UpdateOutcome, AppError> {
    let mut rider = state.riders.lock(&rider_id)?;

    if !rider.is_online {
        return Err(AppError::Conflict("go online before claiming orders".to_string()));
    }

    if let Some(active) = rider.active_order_id {
        return Err(AppError::Conflict(format!(
            "finish order {active} before claiming another"
        )));
    }

    let outcome = state.orders.update_if(
        order_id,
        &Expect::status(OrderStatus::Pending)
            .payment(PaymentStatus::Paid)
            .unassigned(),
        "claim",
        |order| {
            order.status = OrderStatus::Assigned;
            order.rider_id = Some(rider_id);
        },
    )?;

    match &outcome {
        UpdateOutcome::Applied(order) => {
            rider.active_order_id = Some(order.id);
            rider.updated_at = Utc::now();
            info!(order_id = %order.id, rider_id = %rider_id, "order claimed");
        }
        UpdateOutcome::Stale(current) => {
            warn!(
                order_id = %current.id,
                rider_id = %rider_id,
                status = current.status.as_str(),
                "claim lost: order no longer available"
            );
        }
    }

    Ok(outcome)
}
