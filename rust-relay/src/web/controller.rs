//! Webhook pipeline: verify → classify → relay or record → terminal outcome.
//!
//! Every call ends in a [`WebhookOutcome`]. Only a supplied signature that fails
//! verification on the message endpoint ends in [`WebhookOutcome::Rejected`];
//! nothing that happens after verification can change the acknowledgment.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, info, warn};

use crate::relay::ReplyRelay;
use crate::web::context::SignatureContext;
use crate::web::signature::{is_signature_verification_enabled, verify_twilio_signature};
use crate::webhook::{classify, Classification, ContentMessage, InboundWebhookPayload, StatusUpdate};

/// Body returned with every acknowledgment.
pub const ACK_BODY: &str = "OK";

/// Body returned when a signature does not match.
pub const REJECT_BODY: &str = "Invalid signature";

/// What happened to an acknowledged webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// A reply was handed to a background task
    RelayDispatched { message_sid: String },
    /// A delivery status was recorded in the logs
    StatusRecorded(StatusUpdate),
    /// Nothing to act on
    Ignored { reason: &'static str },
}

/// Terminal result of one webhook call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Acknowledged(Disposition),
    Rejected,
}

impl WebhookOutcome {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookOutcome::Acknowledged(_) => StatusCode::OK,
            WebhookOutcome::Rejected => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for WebhookOutcome {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            WebhookOutcome::Acknowledged(_) => ACK_BODY,
            WebhookOutcome::Rejected => REJECT_BODY,
        };
        (status, body).into_response()
    }
}

/// Runs the per-request pipeline for both webhook endpoints.
#[derive(Clone)]
pub struct WebhookController {
    relay: ReplyRelay,
    webhook_secret: Option<String>,
}

impl WebhookController {
    pub fn new(relay: ReplyRelay, webhook_secret: Option<String>) -> Self {
        Self {
            relay,
            webhook_secret,
        }
    }

    /// Inbound message endpoint.
    ///
    /// Content messages are answered from a spawned task; this returns as soon as
    /// the task is dispatched.
    pub fn handle_message(
        &self,
        context: &SignatureContext,
        payload: &InboundWebhookPayload,
        signature: Option<&str>,
    ) -> WebhookOutcome {
        if let Some(signature) = signature {
            if !self.verify(context, signature) {
                warn!(url = %context.url, signature = %signature, "whatsapp_webhook_rejected");
                return WebhookOutcome::Rejected;
            }
        }

        let disposition = match classify(payload) {
            Classification::Content(message) => self.dispatch_relay(message),
            Classification::Status(update) => {
                info!(
                    message_sid = %update.message_sid,
                    "whatsapp_webhook_not_a_message"
                );
                record_status(update)
            }
            Classification::Unrecognized { reason } => {
                info!(reason = reason, "whatsapp_webhook_not_a_message");
                Disposition::Ignored { reason }
            }
        };

        WebhookOutcome::Acknowledged(disposition)
    }

    /// Status callback endpoint.
    ///
    /// Always acknowledged; a bad signature is only logged.
    pub fn handle_status(
        &self,
        context: &SignatureContext,
        payload: &InboundWebhookPayload,
        signature: Option<&str>,
    ) -> WebhookOutcome {
        if let Some(signature) = signature {
            if !self.verify(context, signature) {
                warn!(url = %context.url, "status_callback_signature_invalid");
            }
        }

        let disposition = match classify(payload) {
            Classification::Status(update) => record_status(update),
            Classification::Content(message) => {
                warn!(
                    message_sid = %message.message_sid,
                    "status_callback_received_content_message"
                );
                Disposition::Ignored {
                    reason: "content_on_status_endpoint",
                }
            }
            Classification::Unrecognized { reason } => {
                warn!(reason = reason, "status_callback_unrecognized");
                Disposition::Ignored { reason }
            }
        };

        WebhookOutcome::Acknowledged(disposition)
    }

    fn verify(&self, context: &SignatureContext, signature: &str) -> bool {
        let secret = self.webhook_secret.as_deref();
        let valid = verify_twilio_signature(&context.url, &context.params, signature, secret);
        if valid && is_signature_verification_enabled(secret) {
            info!("twilio_signature_verified");
        }
        valid
    }

    fn dispatch_relay(&self, message: ContentMessage) -> Disposition {
        info!(
            message_sid = %message.message_sid,
            from = %message.from,
            body_length = message.body.len(),
            num_media = message.num_media,
            profile_name = ?message.profile_name,
            "whatsapp_message_received"
        );

        let relay = self.relay.clone();
        let message_sid = message.message_sid.clone();

        tokio::spawn(async move {
            match relay.relay(&message.from, &message.body).await {
                Ok(receipt) => info!(
                    message_sid = %message.message_sid,
                    reply_sid = %receipt.sid,
                    status = %receipt.status,
                    "reply_relay_sent"
                ),
                Err(e) => error!(
                    message_sid = %message.message_sid,
                    error_kind = e.kind(),
                    error = %e,
                    "reply_relay_failed"
                ),
            }
        });

        Disposition::RelayDispatched { message_sid }
    }
}

fn record_status(update: StatusUpdate) -> Disposition {
    if update.is_failure() {
        warn!(
            message_sid = %update.message_sid,
            status = %update.status,
            from = %update.from,
            to = %update.to,
            error_code = ?update.error_code,
            error_message = ?update.error_message,
            "status_callback_delivery_error"
        );
    } else {
        info!(
            message_sid = %update.message_sid,
            status = %update.status,
            from = %update.from,
            to = %update.to,
            "status_callback_recorded"
        );
    }

    Disposition::StatusRecorded(update)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::mpsc;

    use super::*;
    use crate::relay::{MessagingProvider, OutboundReplyReceipt, RelayError};
    use crate::web::signature::compute_signature;
    use crate::webhook::MessageStatus;

    struct ChannelProvider {
        sent: mpsc::UnboundedSender<(String, String)>,
    }

    #[async_trait]
    impl MessagingProvider for ChannelProvider {
        async fn send(
            &self,
            to: &str,
            from: &str,
            body: &str,
        ) -> Result<OutboundReplyReceipt, RelayError> {
            let _ = self.sent.send((to.to_string(), body.to_string()));
            Ok(OutboundReplyReceipt {
                sid: "SMout".to_string(),
                status: "queued".to_string(),
                body: body.to_string(),
                from: from.to_string(),
                to: to.to_string(),
                date_created: Utc::now(),
                date_updated: Utc::now(),
                date_sent: None,
            })
        }
    }

    fn controller(
        secret: Option<&str>,
    ) -> (WebhookController, mpsc::UnboundedReceiver<(String, String)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let relay = ReplyRelay::new(Arc::new(ChannelProvider { sent: tx }), "+14155238886");
        (
            WebhookController::new(relay, secret.map(str::to_string)),
            rx,
        )
    }

    fn request(fields: &[(&str, &str)]) -> (SignatureContext, InboundWebhookPayload) {
        let payload: InboundWebhookPayload = fields.iter().copied().collect();
        let context = SignatureContext {
            url: "https://bot.example.com/webhooks/whatsapp".to_string(),
            params: payload.signed_params(),
        };
        (context, payload)
    }

    #[tokio::test]
    async fn test_content_message_dispatches_relay() {
        let (controller, mut rx) = controller(None);
        let (ctx, payload) = request(&[
            ("MessageSid", "SM1"),
            ("From", "whatsapp:+15551234567"),
            ("Body", "hello"),
        ]);

        let outcome = controller.handle_message(&ctx, &payload, None);
        assert_eq!(
            outcome,
            WebhookOutcome::Acknowledged(Disposition::RelayDispatched {
                message_sid: "SM1".to_string()
            })
        );

        let sent = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            sent,
            ("whatsapp:+15551234567".to_string(), "Echo: hello".to_string())
        );
    }

    #[tokio::test]
    async fn test_valid_signature_is_accepted() {
        let (controller, _rx) = controller(Some("secret"));
        let (ctx, payload) = request(&[("MessageSid", "SM9"), ("MessageStatus", "sent")]);
        let signature = compute_signature("secret", &ctx.url, &ctx.params).unwrap();

        let outcome = controller.handle_message(&ctx, &payload, Some(&signature));
        assert_eq!(outcome.status_code(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_bad_signature_is_rejected_before_relay() {
        let (controller, mut rx) = controller(Some("secret"));
        let (ctx, payload) = request(&[
            ("MessageSid", "SM1"),
            ("From", "whatsapp:+15551234567"),
            ("Body", "hello"),
        ]);

        let outcome = controller.handle_message(&ctx, &payload, Some("bogus"));
        assert_eq!(outcome, WebhookOutcome::Rejected);
        assert_eq!(outcome.status_code(), StatusCode::FORBIDDEN);

        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_missing_signature_skips_verification() {
        let (controller, _rx) = controller(Some("secret"));
        let (ctx, payload) = request(&[("Foo", "bar")]);

        assert_eq!(
            controller.handle_message(&ctx, &payload, None),
            WebhookOutcome::Acknowledged(Disposition::Ignored {
                reason: "missing_message_sid"
            })
        );
    }

    #[tokio::test]
    async fn test_status_endpoint_never_rejects() {
        let (controller, mut rx) = controller(Some("secret"));
        let (ctx, payload) = request(&[
            ("MessageSid", "SM2"),
            ("MessageStatus", "failed"),
            ("ErrorCode", "30003"),
        ]);

        let outcome = controller.handle_status(&ctx, &payload, Some("bogus"));
        match outcome {
            WebhookOutcome::Acknowledged(Disposition::StatusRecorded(update)) => {
                assert_eq!(update.status, MessageStatus::Failed);
                assert_eq!(update.error_code.as_deref(), Some("30003"));
            }
            other => panic!("Expected recorded status, got {:?}", other),
        }

        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }
}
