//! Messaging provider abstraction.
//!
//! The relay only needs "send(to, from, body) → receipt". Keeping that behind a
//! trait lets the web layer run against a recording double in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::RelayError;

/// A reply to send. Addresses may or may not carry the `whatsapp:` prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundReplyRequest {
    /// Recipient address
    pub to: String,
    /// Message text
    pub body: String,
    /// Sender override; falls back to the configured number
    pub from: Option<String>,
}

/// Provider acknowledgement of a sent message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundReplyReceipt {
    /// Provider-assigned message identifier
    pub sid: String,
    pub status: String,
    pub body: String,
    pub from: String,
    pub to: String,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
    /// Absent until the provider has handed the message off
    pub date_sent: Option<DateTime<Utc>>,
}

/// Outbound messaging API.
///
/// Implementations receive fully normalized addresses.
#[async_trait]
pub trait MessagingProvider: Send + Sync {
    async fn send(&self, to: &str, from: &str, body: &str)
        -> Result<OutboundReplyReceipt, RelayError>;
}
