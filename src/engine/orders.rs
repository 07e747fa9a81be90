use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::order::{Order, OrderStatus, PaymentMethod, PaymentStatus};
use crate::state::AppState;
use crate::store::orders::{Expect, UpdateOutcome};

#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    pub address_id: Uuid,
    pub zone_id: Uuid,
    pub pack_id: Uuid,
    pub quantity: u32,
    pub payment_method: PaymentMethod,
}

pub fn order_total(price_cents: i64, quantity: u32) -> Result<i64, AppError> {
    if quantity < 1 {
        return Err(AppError::Validation("quantity must be at least 1".to_string()));
    }

    price_cents
        .checked_mul(i64::from(quantity))
        .ok_or_else(|| AppError::Validation("order total is out of range".to_string()))
}

pub fn create_order(state: &AppState, customer_id: Uuid, request: NewOrder) -> Result<Order, AppError> {
    if request.quantity < 1 {
        return Err(AppError::Validation("quantity must be at least 1".to_string()));
    }

    let pack = state.catalog.active_pack(&request.pack_id)?;
    let zone = state.catalog.active_zone(&request.zone_id)?;
    let address = state
        .catalog
        .address(&request.address_id)
        .filter(|address| address.customer_id == customer_id)
        .ok_or_else(|| AppError::Validation("select one of your saved addresses".to_string()))?;

    if address.zone_id != zone.id {
        return Err(AppError::Validation(
            "address is outside the selected zone".to_string(),
        ));
    }

    let total_cents = order_total(pack.price_cents, request.quantity)?;
    let now = Utc::now();

    let order = state.orders.insert_new(Order {
        id: Uuid::new_v4(),
        customer_id,
        address_id: address.id,
        zone_id: zone.id,
        pack_id: pack.id,
        quantity: request.quantity,
        status: OrderStatus::Pending,
        payment_status: PaymentStatus::Unpaid,
        payment_method: request.payment_method,
        rider_id: None,
        total_cents,
        eta_minutes: None,
        created_at: now,
        updated_at: now,
        delivered_at: None,
        cancelled_at: None,
        failed_at: None,
    })?;

    state.metrics.active_orders.inc();
    state.metrics.transition("create", "applied");
    info!(
        order_id = %order.id,
        customer_id = %customer_id,
        total_cents = order.total_cents,
        "order created"
    );

    Ok(order)
}

/// Customer-owned read.
pub fn customer_order(state: &AppState, customer_id: Uuid, order_id: Uuid) -> Result<Order, AppError> {
    let order = state
        .orders
        .get(&order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

    if order.customer_id != customer_id {
        return Err(AppError::Forbidden("order belongs to another customer".to_string()));
    }

    Ok(order)
}

/// Cancels an order that has not reached a terminal status. A cancel racing a
/// delivery loses: once any terminal status is stored the update is stale.
pub fn cancel_order(state: &AppState, customer_id: Uuid, order_id: Uuid) -> Result<UpdateOutcome, AppError> {
    customer_order(state, customer_id, order_id)?;

    let outcome = state.orders.update_if(
        order_id,
        &Expect::status_in(&OrderStatus::ACTIVE).owned_by(customer_id),
        "cancel",
        |order| {
            order.status = OrderStatus::Cancelled;
            order.cancelled_at = Some(Utc::now());
        },
    )?;

    match &outcome {
        UpdateOutcome::Applied(order) => {
            if let Some(rider_id) = order.rider_id {
                state.riders.release(&rider_id, &order.id);
            }
            state.metrics.active_orders.dec();
            state.metrics.transition("cancel", "applied");
            info!(order_id = %order.id, "order cancelled by customer");
        }
        UpdateOutcome::Stale(current) => {
            state.metrics.transition("cancel", "stale");
            warn!(
                order_id = %current.id,
                status = current.status.as_str(),
                "cancel rejected: order already moved on"
            );
        }
    }

    Ok(outcome)
}
