use std::sync::Arc;

use tokio::sync::broadcast;

use crate::auth::roles::AdminDirectory;
use crate::config::Config;
use crate::observability::metrics::Metrics;
use crate::payments::checkout::CheckoutProvider;
use crate::store::catalog::Catalog;
use crate::store::orders::OrderStore;
use crate::store::payments::PaymentLedger;
use crate::store::riders::RiderStore;

pub struct AppState {
    pub config: Config,
    pub orders: OrderStore,
    pub riders: RiderStore,
    pub payments: PaymentLedger,
    pub catalog: Catalog,
    pub checkout: Arc<dyn CheckoutProvider>,
    pub admins: Arc<dyn AdminDirectory>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        config: Config,
        checkout: Arc<dyn CheckoutProvider>,
        admins: Arc<dyn AdminDirectory>,
    ) -> Self {
        let (events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size.max(1));

        Self {
            config,
            orders: OrderStore::new(events_tx),
            riders: RiderStore::new(),
            payments: PaymentLedger::new(),
            catalog: Catalog::new(),
            checkout,
            admins,
            metrics: Metrics::new(),
        }
    }
}
