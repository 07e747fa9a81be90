use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::location::{record_position, sampling_gate, PositionUpdate};
use crate::models::rider::GeoPoint;
use crate::state::AppState;

/// Device position feed on the rider side. `None` means no fix this tick.
pub trait PositionSource: Send {
    fn next_position(&mut self) -> Option<GeoPoint>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplerExit {
    pub samples: u64,
    pub reason: String,
}

/// Upserts the rider's position every `interval` until the rider goes offline
/// or no longer carries an en-route order.
pub async fn run_location_sampler<S>(
    state: Arc<AppState>,
    rider_id: Uuid,
    mut source: S,
    interval: Duration,
) -> SamplerExit
where
    S: PositionSource,
{
    let mut ticker = tokio::time::interval(interval);
    let mut samples = 0;

    info!(rider_id = %rider_id, "location sampler started");

    let reason = loop {
        ticker.tick().await;

        match sampling_gate(&state, rider_id) {
            Ok(Some(reason)) => break reason,
            Ok(None) => {}
            Err(err) => break err.to_string(),
        }

        let Some(position) = source.next_position() else {
            continue;
        };

        match record_position(&state, rider_id, position) {
            Ok(PositionUpdate::Recorded { .. }) => samples += 1,
            Ok(PositionUpdate::SamplingStopped { reason }) => break reason,
            Err(err) => warn!(rider_id = %rider_id, error = %err, "position sample rejected"),
        }
    };

    info!(rider_id = %rider_id, samples, reason = %reason, "location sampler stopped");
    SamplerExit { samples, reason }
}
