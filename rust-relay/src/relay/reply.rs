//! Echo reply relay.
//!
//! Builds the reply for an inbound message and hands it to the provider.

use std::sync::Arc;

use tracing::{info, warn};

use super::address::{strip_channel_prefix, with_channel_prefix};
use super::error::RelayError;
use super::provider::{MessagingProvider, OutboundReplyReceipt, OutboundReplyRequest};

/// Prefix put in front of the incoming text.
pub const ECHO_PREFIX: &str = "Echo: ";

/// Derive the reply text from the incoming message body.
pub fn echo_body(incoming: &str) -> String {
    format!("{}{}", ECHO_PREFIX, incoming)
}

/// Sends replies through an injected provider.
#[derive(Clone)]
pub struct ReplyRelay {
    provider: Arc<dyn MessagingProvider>,
    default_from: String,
}

impl ReplyRelay {
    /// Create a relay that sends from `default_from` unless a request overrides it.
    pub fn new(provider: Arc<dyn MessagingProvider>, default_from: impl Into<String>) -> Self {
        Self {
            provider,
            default_from: default_from.into(),
        }
    }

    /// Answer an inbound message from `sender_address` with the echo of `incoming_body`.
    pub async fn relay(
        &self,
        sender_address: &str,
        incoming_body: &str,
    ) -> Result<OutboundReplyReceipt, RelayError> {
        let recipient = strip_channel_prefix(sender_address);

        info!(recipient = %recipient, "reply_relay_sending");

        self.send(OutboundReplyRequest {
            to: recipient.to_string(),
            body: echo_body(incoming_body),
            from: None,
        })
        .await
    }

    /// Send an arbitrary reply, normalizing both addresses.
    pub async fn send(
        &self,
        request: OutboundReplyRequest,
    ) -> Result<OutboundReplyReceipt, RelayError> {
        let to = strip_channel_prefix(&request.to);
        if to.is_empty() {
            warn!(to = %request.to, "reply_relay_empty_recipient");
            return Err(RelayError::InvalidAddress(request.to));
        }

        let from = request
            .from
            .as_deref()
            .filter(|f| !strip_channel_prefix(f).is_empty())
            .unwrap_or(self.default_from.as_str());

        let to = with_channel_prefix(to);
        let from = with_channel_prefix(from);

        self.provider.send(&to, &from, &request.body).await
    }
}
