use dashmap::DashMap;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::catalog::{Address, Pack, Zone};
use crate::models::rider::GeoPoint;

pub struct Catalog {
    packs: DashMap<Uuid, Pack>,
    zones: DashMap<Uuid, Zone>,
    addresses: DashMap<Uuid, Address>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            packs: DashMap::new(),
            zones: DashMap::new(),
            addresses: DashMap::new(),
        }
    }

    pub fn add_pack(&self, name: &str, price_cents: i64) -> Result<Pack, AppError> {
        if name.trim().is_empty() {
            return Err(AppError::Validation("pack name cannot be empty".to_string()));
        }
        if price_cents <= 0 {
            return Err(AppError::Validation("price_cents must be > 0".to_string()));
        }

        let pack = Pack {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            price_cents,
            active: true,
        };
        self.packs.insert(pack.id, pack.clone());
        Ok(pack)
    }

    pub fn add_zone(&self, name: &str) -> Result<Zone, AppError> {
        if name.trim().is_empty() {
            return Err(AppError::Validation("zone name cannot be empty".to_string()));
        }

        let zone = Zone {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            active: true,
        };
        self.zones.insert(zone.id, zone.clone());
        Ok(zone)
    }

    pub fn add_address(
        &self,
        customer_id: Uuid,
        zone_id: Uuid,
        label: &str,
        line: &str,
        location: GeoPoint,
    ) -> Result<Address, AppError> {
        if line.trim().is_empty() {
            return Err(AppError::Validation("address line cannot be empty".to_string()));
        }
        if !location.is_valid() {
            return Err(AppError::Validation("coordinates out of range".to_string()));
        }
        self.active_zone(&zone_id)?;

        let address = Address {
            id: Uuid::new_v4(),
            customer_id,
            zone_id,
            label: label.trim().to_string(),
            line: line.trim().to_string(),
            location,
        };
        self.addresses.insert(address.id, address.clone());
        Ok(address)
    }

    pub fn active_pack(&self, id: &Uuid) -> Result<Pack, AppError> {
        self.packs
            .get(id)
            .map(|entry| entry.value().clone())
            .filter(|pack| pack.active)
            .ok_or_else(|| AppError::Validation(format!("pack {id} is not available")))
    }

    pub fn active_zone(&self, id: &Uuid) -> Result<Zone, AppError> {
        self.zones
            .get(id)
            .map(|entry| entry.value().clone())
            .filter(|zone| zone.active)
            .ok_or_else(|| AppError::Validation(format!("zone {id} is not served")))
    }

    pub fn address(&self, id: &Uuid) -> Option<Address> {
        self.addresses.get(id).map(|entry| entry.value().clone())
    }

    pub fn packs(&self) -> Vec<Pack> {
        let mut packs: Vec<Pack> = self
            .packs
            .iter()
            .filter(|entry| entry.active)
            .map(|entry| entry.value().clone())
            .collect();
        packs.sort_by(|a, b| a.price_cents.cmp(&b.price_cents));
        packs
    }

    pub fn zones(&self) -> Vec<Zone> {
        let mut zones: Vec<Zone> = self
            .zones
            .iter()
            .filter(|entry| entry.active)
            .map(|entry| entry.value().clone())
            .collect();
        zones.sort_by(|a, b| a.name.cmp(&b.name));
        zones
    }

    pub fn addresses_for(&self, customer_id: &Uuid) -> Vec<Address> {
        self.addresses
            .iter()
            .filter(|entry| entry.customer_id == *customer_id)
            .map(|entry| entry.value().clone())
            .collect()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
