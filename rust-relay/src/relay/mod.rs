//! Outbound reply relay.
//!
//! ```text
//! ContentMessage → ReplyRelay::relay() → MessagingProvider::send() → Twilio REST API
//! ```

pub mod address;
pub mod error;
pub mod provider;
pub mod reply;
pub mod twilio;

pub use address::{strip_channel_prefix, with_channel_prefix, WHATSAPP_PREFIX};
pub use error::RelayError;
pub use provider::{MessagingProvider, OutboundReplyReceipt, OutboundReplyRequest};
pub use reply::{echo_body, ReplyRelay};
pub use twilio::TwilioClient;
