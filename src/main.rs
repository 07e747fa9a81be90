use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use waterline::api;
use waterline::auth::roles::StaticAdminDirectory;
use waterline::config::Config;
use waterline::error::AppError;
use waterline::payments::checkout::StripeCheckout;
use waterline::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false);
    if config.log_json {
        subscriber.json().init();
    } else {
        subscriber.compact().init();
    }

    if config.webhook_secret.is_none() {
        tracing::warn!("WEBHOOK_SECRET not set; payment webhooks will be refused");
    }
    if config.admin_user_ids.is_empty() {
        tracing::warn!("ADMIN_USER_IDS is empty; admin routes are unreachable");
    }

    let checkout = Arc::new(StripeCheckout::new(config.payment.clone()));
    let admins = Arc::new(StaticAdminDirectory::new(config.admin_user_ids.clone()));
    let http_port = config.http_port;

    let shared_state = Arc::new(AppState::new(config, checkout, admins));
    let app = api::rest::router(shared_state);

    let bind_addr = format!("0.0.0.0:{http_port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
