use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LedgerStatus {
    Pending,
    Paid,
    Failed,
}

/// One checkout session attempt against an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub provider: String,
    pub provider_session_id: String,
    pub amount_cents: i64,
    pub status: LedgerStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Uniqueness key of a ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PaymentKey {
    pub order_id: Uuid,
    pub provider: String,
    pub provider_session_id: String,
}

impl PaymentKey {
    pub fn new(order_id: Uuid, provider: &str, provider_session_id: &str) -> Self {
        Self {
            order_id,
            provider: provider.to_string(),
            provider_session_id: provider_session_id.to_string(),
        }
    }
}
