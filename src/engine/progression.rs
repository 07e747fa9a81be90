use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::order::{Order, OrderStatus};
use crate::state::AppState;
use crate::store::orders::{Expect, UpdateOutcome};

pub fn start_delivery(state: &AppState, rider_id: Uuid, order_id: Uuid) -> Result<UpdateOutcome, AppError> {
    let eta_minutes = state.config.delivery_eta_minutes;

    rider_transition(
        state,
        rider_id,
        order_id,
        Expect::status(OrderStatus::Assigned),
        "start_delivery",
        |order| {
            order.status = OrderStatus::EnRoute;
            order.eta_minutes = Some(eta_minutes);
        },
    )
}

pub fn mark_delivered(state: &AppState, rider_id: Uuid, order_id: Uuid) -> Result<UpdateOutcome, AppError> {
    rider_transition(
        state,
        rider_id,
        order_id,
        Expect::status(OrderStatus::EnRoute),
        "mark_delivered",
        |order| {
            order.status = OrderStatus::Delivered;
            order.delivered_at = Some(Utc::now());
        },
    )
}

pub fn mark_undeliverable(state: &AppState, rider_id: Uuid, order_id: Uuid) -> Result<UpdateOutcome, AppError> {
    rider_transition(
        state,
        rider_id,
        order_id,
        Expect::status_in(&[OrderStatus::Assigned, OrderStatus::EnRoute]),
        "mark_undeliverable",
        |order| {
            order.status = OrderStatus::Failed;
            order.failed_at = Some(Utc::now());
        },
    )
}

fn rider_transition<F>(
    state: &AppState,
    rider_id: Uuid,
    order_id: Uuid,
    expect: Expect,
    transition: &str,
    mutate: F,
) -> Result<UpdateOutcome, AppError>
where
    F: FnOnce(&mut Order),
{
    let outcome = state
        .orders
        .update_if(order_id, &expect.held_by(rider_id), transition, mutate)?;

    match &outcome {
        UpdateOutcome::Applied(order) => {
            if order.status.is_terminal() {
                state.riders.release(&rider_id, &order.id);
                state.metrics.active_orders.dec();
            }
            state.metrics.transition(transition, "applied");
            info!(
                order_id = %order.id,
                rider_id = %rider_id,
                status = order.status.as_str(),
                "{transition} applied"
            );
        }
        UpdateOutcome::Stale(current) => {
            state.metrics.transition(transition, "stale");
            warn!(
                order_id = %current.id,
                rider_id = %rider_id,
                status = current.status.as_str(),
                "{transition} stale: reload order"
            );
        }
    }

    Ok(outcome)
}
