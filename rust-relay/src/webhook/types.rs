//! Inbound webhook types.
//!
//! Twilio posts `application/x-www-form-urlencoded` bodies. The raw field map
//! is kept intact (it is what the signature covers); typed views are derived
//! from it by the classifier.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Twilio field names
// =============================================================================

pub const FIELD_MESSAGE_SID: &str = "MessageSid";
pub const FIELD_ACCOUNT_SID: &str = "AccountSid";
pub const FIELD_FROM: &str = "From";
pub const FIELD_TO: &str = "To";
pub const FIELD_BODY: &str = "Body";
pub const FIELD_NUM_MEDIA: &str = "NumMedia";
pub const FIELD_PROFILE_NAME: &str = "ProfileName";
pub const FIELD_WA_ID: &str = "WaId";
pub const FIELD_MESSAGE_STATUS: &str = "MessageStatus";
pub const FIELD_ERROR_CODE: &str = "ErrorCode";
pub const FIELD_ERROR_MESSAGE: &str = "ErrorMessage";

// =============================================================================
// Raw payload
// =============================================================================

/// Form parameters as the signature covers them: every distinct value of every
/// key, keys and values both sorted.
pub type SignedParams = BTreeMap<String, BTreeSet<String>>;

/// Raw inbound webhook payload: every form field, exactly as received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundWebhookPayload {
    /// Last value per key
    fields: BTreeMap<String, String>,
    /// Every pair in arrival order, repeats included
    pairs: Vec<(String, String)>,
}

impl InboundWebhookPayload {
    /// Parse a form-encoded request body.
    ///
    /// When a key appears more than once, [`get`](Self::get) sees the last
    /// value; [`signed_params`](Self::signed_params) keeps them all.
    pub fn from_form_bytes(body: &[u8]) -> Self {
        url::form_urlencoded::parse(body)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    /// Field value, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Field value, if present and not the empty string.
    ///
    /// Whitespace counts as a value.
    pub fn non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.is_empty())
    }

    /// All fields, sorted by key.
    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Every received value, grouped by key.
    pub fn signed_params(&self) -> SignedParams {
        let mut params = SignedParams::new();
        for (key, value) in &self.pairs {
            params.entry(key.clone()).or_default().insert(value.clone());
        }
        params
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for InboundWebhookPayload
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let pairs: Vec<(String, String)> = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let fields = pairs.iter().cloned().collect();
        Self { fields, pairs }
    }
}

// =============================================================================
// Delivery status
// =============================================================================

/// Delivery status reported by Twilio status callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStatus {
    Queued,
    Sent,
    Delivered,
    Failed,
    Undelivered,
    Read,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Queued => "queued",
            MessageStatus::Sent => "sent",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Failed => "failed",
            MessageStatus::Undelivered => "undelivered",
            MessageStatus::Read => "read",
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a status string is outside the known set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl FromStr for MessageStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "queued" => Ok(MessageStatus::Queued),
            "sent" => Ok(MessageStatus::Sent),
            "delivered" => Ok(MessageStatus::Delivered),
            "failed" => Ok(MessageStatus::Failed),
            "undelivered" => Ok(MessageStatus::Undelivered),
            "read" => Ok(MessageStatus::Read),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

// =============================================================================
// Typed views
// =============================================================================

/// A user message that should be answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentMessage {
    pub message_sid: String,
    pub account_sid: String,
    /// Sender address, usually `whatsapp:+E164`
    pub from: String,
    /// Our number, usually `whatsapp:+E164`
    pub to: String,
    pub body: String,
    pub num_media: u32,
    pub profile_name: Option<String>,
    pub wa_id: Option<String>,
}

/// A delivery status callback for a message we sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub message_sid: String,
    pub account_sid: String,
    pub from: String,
    pub to: String,
    pub status: MessageStatus,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

impl StatusUpdate {
    /// True when Twilio reported a provider-side delivery error.
    pub fn is_failure(&self) -> bool {
        self.error_code.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_form_bytes_decodes_fields() {
        let payload = InboundWebhookPayload::from_form_bytes(
            b"MessageSid=SM1&From=whatsapp%3A%2B15551234567&Body=hello+world&Empty=",
        );

        assert_eq!(payload.get("MessageSid"), Some("SM1"));
        assert_eq!(payload.get("From"), Some("whatsapp:+15551234567"));
        assert_eq!(payload.get("Body"), Some("hello world"));
        assert_eq!(payload.get("Empty"), Some(""));
        assert_eq!(payload.non_empty("Empty"), None);
        assert_eq!(payload.get("Missing"), None);
    }

    #[test]
    fn test_from_form_bytes_last_duplicate_wins() {
        let payload = InboundWebhookPayload::from_form_bytes(b"Body=first&Body=second");
        assert_eq!(payload.get("Body"), Some("second"));
        assert_eq!(payload.fields().len(), 1);
    }

    #[test]
    fn test_signed_params_keep_every_value() {
        let payload =
            InboundWebhookPayload::from_form_bytes(b"MediaUrl=b&Body=hi&MediaUrl=a&MediaUrl=b");
        let params = payload.signed_params();

        assert_eq!(params.len(), 2);
        let media: Vec<&str> = params["MediaUrl"].iter().map(String::as_str).collect();
        assert_eq!(media, ["a", "b"]);
        assert_eq!(params["Body"].len(), 1);
    }

    #[test]
    fn test_whitespace_is_a_value() {
        let payload = InboundWebhookPayload::from_form_bytes(b"Body=+&Other=");
        assert_eq!(payload.non_empty("Body"), Some(" "));
        assert_eq!(payload.non_empty("Other"), None);
    }

    #[test]
    fn test_empty_body() {
        assert!(InboundWebhookPayload::from_form_bytes(b"").is_empty());
    }

    #[test]
    fn test_message_status_parse() {
        assert_eq!("failed".parse::<MessageStatus>(), Ok(MessageStatus::Failed));
        assert_eq!("READ".parse::<MessageStatus>(), Ok(MessageStatus::Read));
        assert_eq!(
            "receiving".parse::<MessageStatus>(),
            Err(UnknownStatus("receiving".to_string()))
        );
        assert_eq!(MessageStatus::Undelivered.to_string(), "undelivered");
    }
}
