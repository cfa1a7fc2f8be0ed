//! Web server module for handling inbound Twilio webhooks.
//!
//! This module provides a thin web server that:
//! - Receives WhatsApp message and status webhooks
//! - Verifies `X-Twilio-Signature` when present
//! - Dispatches the echo reply in the background
//! - Acknowledges immediately
//!
//! The outbound reply never delays the acknowledgment.

pub mod context;
pub mod controller;
pub mod handlers;
pub mod signature;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

pub use context::SignatureContext;
pub use controller::{Disposition, WebhookController, WebhookOutcome};
pub use handlers::{
    health, index, not_found, status_webhook, webhook_panic_response, whatsapp_webhook,
    AppState, HealthResponse,
};
pub use signature::{compute_signature, verify_twilio_signature, SIGNATURE_HEADER};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let webhooks = Router::new()
        .route("/webhooks/whatsapp", post(whatsapp_webhook))
        .route("/webhooks/whatsapp/status", post(status_webhook))
        .layer(CatchPanicLayer::custom(webhook_panic_response));

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .merge(webhooks)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
