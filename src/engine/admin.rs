use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::order::{Order, OrderStatus, PaymentMethod, PaymentStatus};
use crate::state::AppState;
use crate::store::orders::{Expect, UpdateOutcome};

pub const EXPORT_COLUMNS: &str = "order_id,rider_id,user_id,total_cents,delivered_at";

pub fn list_orders(state: &AppState, status: Option<OrderStatus>) -> Vec<Order> {
    state
        .orders
        .list(|order| status.is_none_or(|wanted| order.status == wanted))
}

/// Delivered orders as CSV with a fixed column set. Every field is an id,
/// an integer or an RFC 3339 timestamp, so no quoting is needed.
pub fn export_delivered_csv(state: &AppState) -> String {
    let mut delivered = state
        .orders
        .list(|order| order.status == OrderStatus::Delivered);
    delivered.sort_by(|a, b| a.delivered_at.cmp(&b.delivered_at));

    let mut csv = String::from(EXPORT_COLUMNS);
    csv.push('\n');

    for order in delivered {
        let line = format!(
            "{},{},{},{},{}\n",
            order.id,
            order.rider_id.map(|id| id.to_string()).unwrap_or_default(),
            order.customer_id,
            order.total_cents,
            order
                .delivered_at
                .map(|at| at.to_rfc3339())
                .unwrap_or_default()
        );
        csv.push_str(&line);
    }

    csv
}

/// Records an offline (cash) payment confirmed by an admin.
pub fn mark_paid(state: &AppState, order_id: Uuid) -> Result<UpdateOutcome, AppError> {
    let outcome = state.orders.update_if(
        order_id,
        &Expect::status_in(&OrderStatus::ACTIVE).payment(PaymentStatus::Unpaid),
        "mark_paid",
        |order| {
            order.payment_status = PaymentStatus::Paid;
            order.payment_method = PaymentMethod::Cash;
        },
    )?;

    record(state, "mark_paid", &outcome);
    Ok(outcome)
}

/// Flags a paid order that ended without delivery as refunded.
pub fn refund(state: &AppState, order_id: Uuid) -> Result<UpdateOutcome, AppError> {
    let outcome = state.orders.update_if(
        order_id,
        &Expect::status_in(&[OrderStatus::Cancelled, OrderStatus::Failed])
            .payment(PaymentStatus::Paid),
        "refund",
        |order| order.payment_status = PaymentStatus::Refunded,
    )?;

    record(state, "refund", &outcome);
    Ok(outcome)
}

fn record(state: &AppState, transition: &str, outcome: &UpdateOutcome) {
    let label = if outcome.is_applied() { "applied" } else { "stale" };
    state.metrics.transition(transition, label);
    info!(order_id = %outcome.order().id, outcome = label, "admin {transition}");
}
