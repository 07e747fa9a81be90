use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::payment::{LedgerStatus, Payment, PaymentKey};

/// Ledger of checkout sessions, unique on (order, provider, session).
pub struct PaymentLedger {
    rows: DashMap<PaymentKey, Payment>,
}

impl PaymentLedger {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
        }
    }

    pub fn record_pending(&self, key: PaymentKey, amount_cents: i64) -> Payment {
        self.rows
            .entry(key.clone())
            .or_insert_with(|| new_row(&key, amount_cents, LedgerStatus::Pending))
            .clone()
    }

    /// Updates the row for `key`, inserting it when no row exists yet.
    /// A paid row is never downgraded.
    pub fn upsert_status(&self, key: PaymentKey, status: LedgerStatus, amount_cents: i64) -> Payment {
        self.rows
            .entry(key.clone())
            .and_modify(|row| {
                if row.status != LedgerStatus::Paid {
                    row.status = status;
                    row.updated_at = Utc::now();
                }
            })
            .or_insert_with(|| new_row(&key, amount_cents, status))
            .clone()
    }

    pub fn for_order(&self, order_id: &Uuid) -> Vec<Payment> {
        let mut rows: Vec<Payment> = self
            .rows
            .iter()
            .filter(|entry| entry.key().order_id == *order_id)
            .map(|entry| entry.value().clone())
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        rows
    }

    pub fn has_paid(&self, order_id: &Uuid) -> bool {
        self.rows
            .iter()
            .any(|entry| entry.key().order_id == *order_id && entry.status == LedgerStatus::Paid)
    }
}

impl Default for PaymentLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn new_row(key: &PaymentKey, amount_cents: i64, status: LedgerStatus) -> Payment {
    let now = Utc::now();
    Payment {
        id: Uuid::new_v4(),
        order_id: key.order_id,
        provider: key.provider.clone(),
        provider_session_id: key.provider_session_id.clone(),
        amount_cents,
        status,
        created_at: now,
        updated_at: now,
    }
}
