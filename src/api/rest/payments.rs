use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::payments::checkout::{start_checkout, CheckoutSession};
use crate::payments::signature::{verify, SIGNATURE_HEADER};
use crate::payments::webhook::{handle_event, WebhookOutcome};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/payments/checkout", post(checkout))
        .route("/payments/webhook", post(webhook))
}

#[derive(Deserialize)]
pub struct CheckoutBody {
    pub order_id: Uuid,
}

#[derive(Serialize)]
pub struct WebhookAck {
    pub received: bool,
    #[serde(flatten)]
    pub outcome: WebhookOutcome,
}

async fn checkout(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(payload): Json<CheckoutBody>,
) -> Result<Json<CheckoutSession>, AppError> {
    start_checkout(&state, user.user_id, payload.order_id)
        .await
        .map(Json)
}

async fn webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    let secret = state
        .config
        .webhook_secret
        .as_deref()
        .ok_or_else(|| AppError::Config("WEBHOOK_SECRET is not configured".to_string()))?;

    let header = headers
        .get(SIGNATURE_HEADER)
        .map(|value| value.to_str().unwrap_or_default());

    verify(
        secret,
        header,
        &body,
        state.config.webhook_tolerance_secs,
        Utc::now().timestamp(),
    )?;

    let outcome = handle_event(&state, state.checkout.name(), &body)?;

    Ok(Json(WebhookAck {
        received: true,
        outcome,
    }))
}
