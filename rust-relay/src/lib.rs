//! WhatsApp relay - Twilio webhook receiver with an echo auto-reply.
//!
//! ## Architecture
//!
//! ```text
//! Twilio → POST /webhooks/whatsapp → verify → classify → 200 OK
//!                                                 └─ spawn → ReplyRelay → Twilio REST API
//! ```

pub mod config;
pub mod relay;
pub mod web;
pub mod webhook;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use relay::{MessagingProvider, ReplyRelay, TwilioClient};
pub use web::{router, AppState, WebhookController, WebhookOutcome};
pub use webhook::{classify, Classification, InboundWebhookPayload};
