use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::order::{Order, OrderEvent, OrderStatus, PaymentStatus};

/// Preconditions a conditional update checks against the persisted record.
///
/// An empty expectation matches every record; each builder call narrows it.
#[derive(Debug, Clone, Default)]
pub struct Expect {
    statuses: Vec<OrderStatus>,
    rider: Option<Option<Uuid>>,
    payment_status: Option<PaymentStatus>,
    customer_id: Option<Uuid>,
}

impl Expect {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn status(status: OrderStatus) -> Self {
        Self::status_in(&[status])
    }

    pub fn status_in(statuses: &[OrderStatus]) -> Self {
        Self {
            statuses: statuses.to_vec(),
            ..Self::default()
        }
    }

    pub fn unassigned(mut self) -> Self {
        self.rider = Some(None);
        self
    }

    pub fn held_by(mut self, rider_id: Uuid) -> Self {
        self.rider = Some(Some(rider_id));
        self
    }

    pub fn payment(mut self, payment_status: PaymentStatus) -> Self {
        self.payment_status = Some(payment_status);
        self
    }

    pub fn owned_by(mut self, customer_id: Uuid) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn matches(&self, order: &Order) -> bool {
        let status_ok = self.statuses.is_empty() || self.statuses.contains(&order.status);
        let rider_ok = self.rider.is_none_or(|rider| rider == order.rider_id);
        let payment_ok = self
            .payment_status
            .is_none_or(|payment| payment == order.payment_status);
        let owner_ok = self
            .customer_id
            .is_none_or(|customer| customer == order.customer_id);

        status_ok && rider_ok && payment_ok && owner_ok
    }
}

/// Result of a conditional update. `Stale` is the "zero rows affected" signal
/// and carries the record as it currently stands.
#[derive(Debug, Clone)]
pub enum UpdateOutcome {
    Applied(Order),
    Stale(Order),
}

impl UpdateOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, UpdateOutcome::Applied(_))
    }

    pub fn rows_affected(&self) -> u64 {
        match self {
            UpdateOutcome::Applied(_) => 1,
            UpdateOutcome::Stale(_) => 0,
        }
    }

    pub fn order(&self) -> &Order {
        match self {
            UpdateOutcome::Applied(order) | UpdateOutcome::Stale(order) => order,
        }
    }

    /// Surfaces a stale outcome as a conflict for callers that cannot act on it.
    pub fn into_applied(self, conflict_message: &str) -> Result<Order, AppError> {
        match self {
            UpdateOutcome::Applied(order) => Ok(order),
            UpdateOutcome::Stale(_) => Err(AppError::Conflict(conflict_message.to_string())),
        }
    }
}

pub struct OrderStore {
    orders: DashMap<Uuid, Order>,
    active_by_customer: DashMap<Uuid, Uuid>,
    events_tx: broadcast::Sender<OrderEvent>,
}

impl OrderStore {
    pub fn new(events_tx: broadcast::Sender<OrderEvent>) -> Self {
        Self {
            orders: DashMap::new(),
            active_by_customer: DashMap::new(),
            events_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.events_tx.subscribe()
    }

    /// Inserts a freshly built order, holding the customer's active-order slot
    /// so two concurrent creations cannot both succeed.
    pub fn insert_new(&self, order: Order) -> Result<Order, AppError> {
        match self.active_by_customer.entry(order.customer_id) {
            Entry::Occupied(slot) => Err(AppError::Validation(format!(
                "customer already has an active order {}",
                slot.get()
            ))),
            Entry::Vacant(slot) => {
                self.orders.insert(order.id, order.clone());
                slot.insert(order.id);
                self.publish(&order, "created");
                Ok(order)
            }
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<Order> {
        self.orders.get(id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn active_for_customer(&self, customer_id: &Uuid) -> Option<Uuid> {
        self.active_by_customer
            .get(customer_id)
            .map(|entry| *entry.value())
    }

    pub fn list(&self, filter: impl Fn(&Order) -> bool) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|entry| filter(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }

    /// Applies `mutate` iff the current record satisfies `expect`, atomically
    /// under the record's entry lock.
    pub fn update_if<F>(
        &self,
        id: Uuid,
        expect: &Expect,
        transition: &str,
        mutate: F,
    ) -> Result<UpdateOutcome, AppError>
    where
        F: FnOnce(&mut Order),
    {
        let mut entry = self
            .orders
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;

        if !expect.matches(&entry) {
            return Ok(UpdateOutcome::Stale(entry.clone()));
        }

        let mut next = entry.clone();
        mutate(&mut next);

        if next.status.rank() < entry.status.rank()
            || (entry.status.is_terminal() && next.status != entry.status)
        {
            return Err(AppError::Internal(format!(
                "refusing {transition} on order {id}: {} -> {}",
                entry.status.as_str(),
                next.status.as_str()
            )));
        }

        next.updated_at = Utc::now();
        *entry = next.clone();
        drop(entry);

        if next.status.is_terminal() {
            self.active_by_customer
                .remove_if(&next.customer_id, |_, active| *active == next.id);
        }

        self.publish(&next, transition);
        Ok(UpdateOutcome::Applied(next))
    }

    fn publish(&self, order: &Order, transition: &str) {
        let _ = self
            .events_tx
            .send(OrderEvent::from_order(order, transition));
    }
}
