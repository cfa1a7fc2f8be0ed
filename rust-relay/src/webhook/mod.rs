//! Inbound webhook payloads and their classification.
//!
//! ```text
//! form body → InboundWebhookPayload → classify() → Content | Status | Unrecognized
//! ```

pub mod classify;
pub mod types;

pub use classify::{classify, Classification};
pub use types::{ContentMessage, InboundWebhookPayload, MessageStatus, SignedParams, StatusUpdate};
