//! WhatsApp address normalization.
//!
//! Twilio addresses WhatsApp endpoints as `whatsapp:+E164`. Inbound `From`
//! values already carry the prefix; configured numbers usually don't.

/// Channel-scheme prefix for WhatsApp addresses.
pub const WHATSAPP_PREFIX: &str = "whatsapp:";

/// Remove the channel prefix (repeatedly, if it was doubled up).
pub fn strip_channel_prefix(address: &str) -> &str {
    let mut rest = address.trim();
    while let Some(stripped) = rest.strip_prefix(WHATSAPP_PREFIX) {
        rest = stripped.trim_start();
    }
    rest
}

/// Normalize an address so it carries the channel prefix exactly once.
pub fn with_channel_prefix(address: &str) -> String {
    format!("{}{}", WHATSAPP_PREFIX, strip_channel_prefix(address))
}
