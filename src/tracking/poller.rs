use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::engine::location::{track_order, TrackingView};
use crate::state::AppState;

#[derive(Debug, Clone)]
pub enum PollUpdate {
    View(TrackingView),
    /// Inline notice; polling carries on.
    Failed(String),
}

/// Customer-side polling of an order's rider position. Ends when the order
/// is terminal or the receiver goes away.
pub async fn poll_order_location(
    state: Arc<AppState>,
    customer_id: Uuid,
    order_id: Uuid,
    interval: Duration,
    updates: mpsc::Sender<PollUpdate>,
) {
    let mut ticker = tokio::time::interval(interval);

    loop {
        ticker.tick().await;

        let update = match track_order(&state, customer_id, order_id) {
            Ok(view) => view,
            Err(err) => {
                warn!(order_id = %order_id, error = %err, "location poll failed");
                if updates.send(PollUpdate::Failed(err.to_string())).await.is_err() {
                    break;
                }
                continue;
            }
        };

        let keep_polling = update.keep_polling;
        if updates.send(PollUpdate::View(update)).await.is_err() {
            break;
        }
        if !keep_polling {
            debug!(order_id = %order_id, "order is terminal; polling stopped");
            break;
        }
    }
}
