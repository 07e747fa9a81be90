use std::env;
use std::time::Duration;

use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub log_json: bool,
    pub event_buffer_size: usize,
    pub jwt_secret: String,
    pub webhook_secret: Option<String>,
    pub webhook_tolerance_secs: i64,
    pub admin_user_ids: Vec<Uuid>,
    pub admin_check_timeout: Duration,
    pub delivery_eta_minutes: u32,
    pub min_charge_cents: i64,
    pub currency: String,
    pub location_interval_secs: u64,
    pub payment: PaymentProviderConfig,
}

#[derive(Debug, Clone)]
pub struct PaymentProviderConfig {
    pub api_base: String,
    pub api_key: String,
    pub success_url: String,
    pub cancel_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let jwt_secret = env::var("JWT_SECRET")
            .ok()
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| AppError::Config("JWT_SECRET must be set".to_string()))?;

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_json: env::var("LOG_FORMAT")
                .is_ok_and(|format| format.eq_ignore_ascii_case("json")),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            jwt_secret,
            webhook_secret: env::var("WEBHOOK_SECRET")
                .ok()
                .filter(|secret| !secret.is_empty()),
            webhook_tolerance_secs: parse_or_default("WEBHOOK_TOLERANCE_SECS", 300)?,
            admin_user_ids: parse_uuid_list("ADMIN_USER_IDS")?,
            admin_check_timeout: Duration::from_millis(parse_or_default(
                "ADMIN_CHECK_TIMEOUT_MS",
                1500,
            )?),
            delivery_eta_minutes: parse_or_default("DELIVERY_ETA_MINUTES", 10)?,
            min_charge_cents: parse_or_default("MIN_CHARGE_CENTS", 100)?,
            currency: env::var("CURRENCY").unwrap_or_else(|_| "mxn".to_string()),
            location_interval_secs: parse_or_default("LOCATION_INTERVAL_SECS", 5)?,
            payment: PaymentProviderConfig {
                api_base: env::var("PAYMENT_API_BASE")
                    .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
                api_key: env::var("PAYMENT_API_KEY").unwrap_or_default(),
                success_url: env::var("CHECKOUT_SUCCESS_URL")
                    .unwrap_or_else(|_| "http://localhost:3000/checkout/success".to_string()),
                cancel_url: env::var("CHECKOUT_CANCEL_URL")
                    .unwrap_or_else(|_| "http://localhost:3000/checkout/cancel".to_string()),
            },
        })
    }

    /// Defaults suitable for tests and local runs; only the JWT secret is required.
    pub fn for_secret(jwt_secret: &str) -> Self {
        Self {
            http_port: 3000,
            log_level: "info".to_string(),
            log_json: false,
            event_buffer_size: 1024,
            jwt_secret: jwt_secret.to_string(),
            webhook_secret: None,
            webhook_tolerance_secs: 300,
            admin_user_ids: Vec::new(),
            admin_check_timeout: Duration::from_millis(1500),
            delivery_eta_minutes: 10,
            min_charge_cents: 100,
            currency: "mxn".to_string(),
            location_interval_secs: 5,
            payment: PaymentProviderConfig {
                api_base: "https://api.stripe.com".to_string(),
                api_key: String::new(),
                success_url: "http://localhost:3000/checkout/success".to_string(),
                cancel_url: "http://localhost:3000/checkout/cancel".to_string(),
            },
        }
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Config(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}

fn parse_uuid_list(key: &str) -> Result<Vec<Uuid>, AppError> {
    let Ok(raw) = env::var(key) else {
        return Ok(Vec::new());
    };

    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            Uuid::parse_str(item).map_err(|err| AppError::Config(format!("invalid {key}: {err}")))
        })
        .collect()
}
