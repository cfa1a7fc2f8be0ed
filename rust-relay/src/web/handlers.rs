//! HTTP endpoint handlers.
//!
//! Webhook handlers keep the raw request around until the signature context is
//! built, then hand everything to the [`WebhookController`]. They never await
//! the outbound reply.

use std::any::Any;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{OriginalUri, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info};

use crate::web::context::SignatureContext;
use crate::web::controller::{WebhookController, WebhookOutcome};
use crate::web::signature::SIGNATURE_HEADER;
use crate::webhook::InboundWebhookPayload;
use crate::Config;

/// Name reported by the health and index endpoints.
pub const SERVICE_NAME: &str = "Twilio WhatsApp Bot";

/// Body returned when a webhook handler panicked.
pub const PANIC_BODY: &str = "Error processed";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub controller: WebhookController,
}

impl AppState {
    pub fn new(config: Config, controller: WebhookController) -> Self {
        Self {
            config: Arc::new(config),
            controller,
        }
    }
}

// =============================================================================
// Health / Index
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub service: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().to_rfc3339(),
        service: SERVICE_NAME,
    })
}

#[derive(Serialize)]
pub struct EndpointList {
    pub health: &'static str,
    pub webhook: &'static str,
    #[serde(rename = "statusCallback")]
    pub status_callback: &'static str,
}

/// Service description response.
#[derive(Serialize)]
pub struct IndexResponse {
    pub message: String,
    pub version: &'static str,
    pub endpoints: EndpointList,
}

/// Root endpoint listing the available routes.
pub async fn index() -> Json<IndexResponse> {
    Json(IndexResponse {
        message: format!("{} API", SERVICE_NAME),
        version: env!("CARGO_PKG_VERSION"),
        endpoints: EndpointList {
            health: "/health",
            webhook: "/webhooks/whatsapp",
            status_callback: "/webhooks/whatsapp/status",
        },
    })
}

/// Error body for unknown routes.
#[derive(Serialize)]
pub struct NotFoundResponse {
    pub error: &'static str,
    pub message: String,
}

/// Fallback for unknown routes.
pub async fn not_found(method: Method, uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(NotFoundResponse {
            error: "Not Found",
            message: format!("Route {} {} not found", method, uri.path()),
        }),
    )
}

// =============================================================================
// WhatsApp Webhooks
// =============================================================================

/// Inbound WhatsApp message endpoint.
///
/// 1. Rebuilds the signed URL and parameters from the raw request
/// 2. Verifies `X-Twilio-Signature` if the header is present
/// 3. Classifies the payload and dispatches the echo reply in the background
/// 4. Returns 200 `OK` (403 only for a bad signature)
pub async fn whatsapp_webhook(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> WebhookOutcome {
    let (context, payload, signature) = read_webhook(&state, &uri, &headers, &body);

    info!(
        path = %uri.path(),
        message_sid = payload.get("MessageSid").unwrap_or(""),
        has_signature = signature.is_some(),
        field_count = payload.fields().len(),
        body_length = body.len(),
        "whatsapp_webhook_received"
    );

    state
        .controller
        .handle_message(&context, &payload, signature.as_deref())
}

/// Delivery status callback endpoint. Always returns 200 `OK`.
pub async fn status_webhook(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> WebhookOutcome {
    let (context, payload, signature) = read_webhook(&state, &uri, &headers, &body);

    info!(
        path = %uri.path(),
        message_sid = payload.get("MessageSid").unwrap_or(""),
        has_signature = signature.is_some(),
        "status_callback_received"
    );

    state
        .controller
        .handle_status(&context, &payload, signature.as_deref())
}

/// Parse the raw body and capture the signature inputs before anything else.
fn read_webhook(
    state: &AppState,
    uri: &Uri,
    headers: &HeaderMap,
    body: &Bytes,
) -> (SignatureContext, InboundWebhookPayload, Option<String>) {
    let payload = InboundWebhookPayload::from_form_bytes(body);
    let context = SignatureContext::from_request(
        headers,
        uri,
        &payload,
        state.config.public_base_url.as_deref(),
    );
    // Unreadable bytes still count as a supplied signature; they can never verify.
    let signature = headers
        .get(SIGNATURE_HEADER)
        .filter(|v| !v.is_empty())
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());

    (context, payload, signature)
}

/// Turn a panic inside a webhook handler into an acknowledgment.
///
/// Twilio retries any non-2xx response.
pub fn webhook_panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    error!(panic = %detail, "webhook_handler_panicked");

    (StatusCode::OK, PANIC_BODY).into_response()
}
