//! Reconciliation of checkout webhooks against orders and the payment ledger.
//!
//! Delivery is at-least-once, so every branch is safe to replay: ledger rows
//! are keyed on the provider session id and the order update is idempotent.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::order::{PaymentMethod, PaymentStatus};
use crate::models::payment::{LedgerStatus, PaymentKey};
use crate::state::AppState;
use crate::store::orders::Expect;

pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
pub const CHECKOUT_EXPIRED: &str = "checkout.session.expired";

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Option<EventData>,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    /// Shape depends on the event kind; only checkout sessions are decoded.
    pub object: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct CheckoutSessionObject {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    pub amount_total: Option<i64>,
}

impl CheckoutSessionObject {
    fn order_reference(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.get("order_id"))
            .and_then(|value| value.as_str())
            .or(self.client_reference_id.as_deref())
            .filter(|reference| !reference.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum WebhookOutcome {
    Processed { order_id: Uuid },
    Ignored { note: String },
}

impl WebhookOutcome {
    fn ignored(note: &str) -> Self {
        WebhookOutcome::Ignored {
            note: note.to_string(),
        }
    }
}

/// Applies a verified webhook body. Signature checks happen before this.
pub fn handle_event(state: &AppState, provider: &str, body: &[u8]) -> Result<WebhookOutcome, AppError> {
    let event: WebhookEvent = serde_json::from_slice(body)
        .map_err(|err| AppError::Validation(format!("malformed event payload: {err}")))?;

    let outcome = match event.kind.as_str() {
        CHECKOUT_COMPLETED => with_correlation(state, provider, &event, checkout_completed)?,
        CHECKOUT_EXPIRED => with_correlation(state, provider, &event, checkout_expired)?,
        _ => WebhookOutcome::ignored("event kind not handled"),
    };

    let label = match &outcome {
        WebhookOutcome::Processed { .. } => "processed",
        WebhookOutcome::Ignored { .. } => "ignored",
    };
    let kind_label = match event.kind.as_str() {
        CHECKOUT_COMPLETED | CHECKOUT_EXPIRED => event.kind.as_str(),
        _ => "other",
    };
    state.metrics.webhook(kind_label, label);
    info!(
        event_id = event.id.as_deref().unwrap_or("-"),
        kind = %event.kind,
        outcome = label,
        "webhook handled"
    );

    Ok(outcome)
}

struct Correlation<'a> {
    order_id: Uuid,
    session_id: &'a str,
    amount_total: Option<i64>,
}

fn with_correlation<F>(
    state: &AppState,
    provider: &str,
    event: &WebhookEvent,
    apply: F,
) -> Result<WebhookOutcome, AppError>
where
    F: FnOnce(&AppState, &str, Correlation<'_>) -> Result<WebhookOutcome, AppError>,
{
    let Some(object) = event.data.as_ref().map(|data| &data.object) else {
        return Ok(WebhookOutcome::ignored("event carries no session"));
    };

    let Ok(session) = CheckoutSessionObject::deserialize(object) else {
        warn!(kind = %event.kind, "webhook session payload not understood");
        return Ok(WebhookOutcome::ignored("session payload not understood"));
    };

    let Some(reference) = session.order_reference() else {
        warn!(kind = %event.kind, "webhook without order reference");
        return Ok(WebhookOutcome::ignored("no order reference"));
    };

    let Ok(order_id) = Uuid::parse_str(reference.trim()) else {
        warn!(kind = %event.kind, reference, "webhook order reference is not an id");
        return Ok(WebhookOutcome::ignored("order reference is not an order id"));
    };

    let Some(session_id) = session.id.as_deref().filter(|id| !id.is_empty()) else {
        return Ok(WebhookOutcome::ignored("no session id"));
    };

    if state.orders.get(&order_id).is_none() {
        warn!(order_id = %order_id, "webhook for unknown order");
        return Ok(WebhookOutcome::ignored("unknown order"));
    }

    apply(
        state,
        provider,
        Correlation {
            order_id,
            session_id,
            amount_total: session.amount_total,
        },
    )
}

fn checkout_completed(
    state: &AppState,
    provider: &str,
    correlation: Correlation<'_>,
) -> Result<WebhookOutcome, AppError> {
    // ledger first: a concurrent expiry checks it under the order lock
    let total_cents = state
        .orders
        .get(&correlation.order_id)
        .map(|order| order.total_cents)
        .unwrap_or_default();
    state.payments.upsert_status(
        PaymentKey::new(correlation.order_id, provider, correlation.session_id),
        LedgerStatus::Paid,
        correlation.amount_total.unwrap_or(total_cents),
    );

    // no status precondition: payment may land after the order moved on
    state.orders.update_if(
        correlation.order_id,
        &Expect::any(),
        "payment_confirmed",
        |order| {
            if order.payment_status != PaymentStatus::Refunded {
                order.payment_status = PaymentStatus::Paid;
            }
            order.payment_method = PaymentMethod::Card;
        },
    )?;

    Ok(WebhookOutcome::Processed {
        order_id: correlation.order_id,
    })
}

fn checkout_expired(
    state: &AppState,
    provider: &str,
    correlation: Correlation<'_>,
) -> Result<WebhookOutcome, AppError> {
    let order_id = correlation.order_id;
    let total_cents = state
        .orders
        .get(&order_id)
        .map(|order| order.total_cents)
        .unwrap_or_default();

    state.payments.upsert_status(
        PaymentKey::new(order_id, provider, correlation.session_id),
        LedgerStatus::Failed,
        correlation.amount_total.unwrap_or(total_cents),
    );

    state
        .orders
        .update_if(order_id, &Expect::any(), "payment_expired", |order| {
            let settled = order.payment_status == PaymentStatus::Refunded
                || state.payments.has_paid(&order_id)
                || (order.payment_status == PaymentStatus::Paid
                    && order.payment_method == PaymentMethod::Cash);
            if !settled {
                order.payment_status = PaymentStatus::Unpaid;
            }
        })?;

    Ok(WebhookOutcome::Processed { order_id })
}
