//! WhatsApp relay web server.
//!
//! This binary provides a thin web server that:
//! - Receives WhatsApp webhooks from Twilio
//! - Verifies the Twilio signature when one is sent
//! - Replies to every message with an echo, in the background
//! - Returns 200 OK without waiting for the reply

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use whatsapp_relay::{router, AppState, Config, ReplyRelay, TwilioClient, WebhookController};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    // Missing credentials are fatal
    let config = Config::from_env().context("Invalid configuration")?;
    info!(
        port = config.port,
        phone_number = %config.twilio_phone_number,
        twilio_api_base = %config.twilio_api_base,
        webhook_secret_configured = config.signature_verification_enabled(),
        public_base_url = ?config.public_base_url,
        request_timeout_ms = config.request_timeout_ms,
        "config_loaded"
    );

    if !config.signature_verification_enabled() {
        warn!("twilio_webhook_secret_not_configured_signatures_accepted");
    }

    // Provider client is built once and injected into the relay
    let provider = Arc::new(TwilioClient::new(&config)?);
    let relay = ReplyRelay::new(provider, config.twilio_phone_number.clone());
    let controller = WebhookController::new(relay, config.twilio_webhook_secret.clone());

    let port = config.port;
    let app = router(AppState::new(config, controller));

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(
        address = %addr,
        webhook_path = "/webhooks/whatsapp",
        status_callback_path = "/webhooks/whatsapp/status",
        "web_server_listening"
    );

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "ctrl_c_handler_install_failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "sigterm_handler_install_failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
