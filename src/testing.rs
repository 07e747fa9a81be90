use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::roles::StaticAdminDirectory;
use crate::config::Config;
use crate::engine::orders::{create_order, NewOrder};
use crate::models::order::{Order, PaymentMethod};
use crate::models::rider::GeoPoint;
use crate::payments::checkout::{CheckoutProvider, CheckoutRequest, CheckoutSession, ProviderError};
use crate::state::AppState;

pub struct FakeCheckout;

#[async_trait]
impl CheckoutProvider for FakeCheckout {
    fn name(&self) -> &str {
        "stripe"
    }

    async fn create_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, ProviderError> {
        Ok(CheckoutSession {
            session_id: format!("cs_test_{}", request.order_id.simple()),
            url: "https://checkout.test/pay".to_string(),
        })
    }
}

pub fn test_state() -> AppState {
    AppState::new(
        Config::for_secret("test-secret"),
        Arc::new(FakeCheckout),
        Arc::new(StaticAdminDirectory::default()),
    )
}

/// Unpaid order for a 7999-cent pack.
pub fn seed_order(state: &AppState, customer_id: Uuid, quantity: u32) -> Order {
    let zone = state.catalog.add_zone("Centro").unwrap();
    let pack = state.catalog.add_pack("Garrafón 20L", 7999).unwrap();
    let address = state
        .catalog
        .add_address(
            customer_id,
            zone.id,
            "home",
            "Av. Juárez 10",
            GeoPoint { lat: 19.4326, lng: -99.1332 },
        )
        .unwrap();

    create_order(
        state,
        customer_id,
        NewOrder {
            address_id: address.id,
            zone_id: zone.id,
            pack_id: pack.id,
            quantity,
            payment_method: PaymentMethod::Card,
        },
    )
    .unwrap()
}

/// Paid (cash-confirmed) order ready to be claimed.
pub fn seed_paid_order(state: &AppState, customer_id: Uuid) -> Order {
    let order = seed_order(state, customer_id, 1);
    crate::engine::admin::mark_paid(state, order.id)
        .unwrap()
        .into_applied("seeded order should be payable")
        .unwrap()
}

pub fn online_rider(state: &AppState, name: &str) -> Uuid {
    let rider = state.riders.register(Uuid::new_v4(), name).unwrap();
    state.riders.set_online(&rider.id, true).unwrap();
    rider.id
}
