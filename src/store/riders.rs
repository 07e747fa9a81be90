use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::mapref::one::RefMut;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::rider::{GeoPoint, Rider, RiderLocation};

pub struct RiderStore {
    riders: DashMap<Uuid, Rider>,
    by_user: DashMap<Uuid, Uuid>,
    locations: DashMap<Uuid, RiderLocation>,
}

impl RiderStore {
    pub fn new() -> Self {
        Self {
            riders: DashMap::new(),
            by_user: DashMap::new(),
            locations: DashMap::new(),
        }
    }

    /// Links a new rider profile to `user_id`; one profile per identity.
    pub fn register(&self, user_id: Uuid, name: &str) -> Result<Rider, AppError> {
        match self.by_user.entry(user_id) {
            Entry::Occupied(_) => Err(AppError::Conflict(
                "a rider profile already exists for this account".to_string(),
            )),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let rider = Rider {
                    id: Uuid::new_v4(),
                    user_id,
                    name: name.trim().to_string(),
                    is_online: false,
                    active_order_id: None,
                    created_at: now,
                    updated_at: now,
                };
                self.riders.insert(rider.id, rider.clone());
                slot.insert(rider.id);
                Ok(rider)
            }
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<Rider> {
        self.riders.get(id).map(|entry| entry.value().clone())
    }

    pub fn find_by_user(&self, user_id: &Uuid) -> Option<Rider> {
        let rider_id = *self.by_user.get(user_id)?.value();
        self.get(&rider_id)
    }

    pub fn len(&self) -> usize {
        self.riders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.riders.is_empty()
    }

    /// Exclusive handle on a rider profile. Callers may touch the order map
    /// while holding it, never the other way round.
    pub fn lock(&self, id: &Uuid) -> Result<RefMut<'_, Uuid, Rider>, AppError> {
        self.riders
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("rider {id} not found")))
    }

    pub fn set_online(&self, id: &Uuid, online: bool) -> Result<Rider, AppError> {
        let mut rider = self.lock(id)?;

        if !online {
            if let Some(order_id) = rider.active_order_id {
                return Err(AppError::Conflict(format!(
                    "cannot go offline while holding order {order_id}"
                )));
            }
        }

        rider.is_online = online;
        rider.updated_at = Utc::now();
        Ok(rider.clone())
    }

    /// Frees the rider's active-order slot if it still points at `order_id`.
    pub fn release(&self, id: &Uuid, order_id: &Uuid) {
        if let Some(mut rider) = self.riders.get_mut(id) {
            if rider.active_order_id.as_ref() == Some(order_id) {
                rider.active_order_id = None;
                rider.updated_at = Utc::now();
            }
        }
    }

    pub fn upsert_location(&self, rider_id: Uuid, position: GeoPoint) -> RiderLocation {
        let location = RiderLocation {
            rider_id,
            position,
            recorded_at: Utc::now(),
        };
        self.locations.insert(rider_id, location.clone());
        location
    }

    pub fn location(&self, rider_id: &Uuid) -> Option<RiderLocation> {
        self.locations.get(rider_id).map(|entry| entry.value().clone())
    }
}

impl Default for RiderStore {
    fn default() -> Self {
        Self::new()
    }
}
