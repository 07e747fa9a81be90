use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::config::PaymentProviderConfig;
use crate::engine::orders::customer_order;
use crate::error::AppError;
use crate::models::order::PaymentStatus;
use crate::models::payment::PaymentKey;
use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub order_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckoutSession {
    pub session_id: String,
    pub url: String,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// Hosted-checkout provider. The session must carry the order id back in the
/// webhook (`metadata.order_id` or `client_reference_id`).
#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn create_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, ProviderError>;
}

/// Stripe Checkout over its form-encoded REST API.
#[derive(Debug, Clone)]
pub struct StripeCheckout {
    config: PaymentProviderConfig,
    http: Client,
}

impl StripeCheckout {
    pub fn new(config: PaymentProviderConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StripeSessionResponse {
    id: String,
    url: Option<String>,
}

#[async_trait]
impl CheckoutProvider for StripeCheckout {
    fn name(&self) -> &str {
        "stripe"
    }

    async fn create_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, ProviderError> {
        let url = format!("{}/v1/checkout/sessions", self.config.api_base);
        let order_id = request.order_id.to_string();
        let amount = request.amount_cents.to_string();

        let form = [
            ("mode", "payment"),
            ("success_url", self.config.success_url.as_str()),
            ("cancel_url", self.config.cancel_url.as_str()),
            ("client_reference_id", order_id.as_str()),
            ("metadata[order_id]", order_id.as_str()),
            ("line_items[0][quantity]", "1"),
            ("line_items[0][price_data][currency]", request.currency.as_str()),
            ("line_items[0][price_data][unit_amount]", amount.as_str()),
            (
                "line_items[0][price_data][product_data][name]",
                request.description.as_str(),
            ),
        ];

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            return Err(ProviderError::UnexpectedResponse(format!(
                "create session failed with status {status}: {text}"
            )));
        }

        let parsed: StripeSessionResponse = response.json().await?;
        let url = parsed.url.ok_or_else(|| {
            ProviderError::UnexpectedResponse("session has no redirect url".to_string())
        })?;

        Ok(CheckoutSession {
            session_id: parsed.id,
            url,
        })
    }
}

/// Opens a checkout session for an order the caller owns and can still pay.
pub async fn start_checkout(
    state: &AppState,
    customer_id: Uuid,
    order_id: Uuid,
) -> Result<CheckoutSession, AppError> {
    let order = customer_order(state, customer_id, order_id)?;

    if order.payment_status != PaymentStatus::Unpaid {
        return Err(AppError::Conflict("order is already paid".to_string()));
    }
    if order.status.is_terminal() {
        return Err(AppError::Conflict(format!(
            "order is {} and can no longer be paid",
            order.status.as_str()
        )));
    }
    if order.total_cents < state.config.min_charge_cents {
        return Err(AppError::Validation(format!(
            "amount must be at least {} cents",
            state.config.min_charge_cents
        )));
    }

    let request = CheckoutRequest {
        order_id,
        amount_cents: order.total_cents,
        currency: state.config.currency.clone(),
        description: format!("Water delivery {}", order.id),
    };

    let session = state
        .checkout
        .create_session(&request)
        .await
        .map_err(|err| AppError::Upstream(err.to_string()))?;

    state.payments.record_pending(
        PaymentKey::new(order_id, state.checkout.name(), &session.session_id),
        order.total_cents,
    );
    info!(order_id = %order_id, session_id = %session.session_id, "checkout session opened");

    Ok(session)
}
