//! Webhook classification.
//!
//! Twilio uses the same field names for inbound messages and status callbacks,
//! so the kind of event is decided from which fields are populated.

use tracing::info;

use super::types::{
    ContentMessage, InboundWebhookPayload, MessageStatus, StatusUpdate, FIELD_ACCOUNT_SID,
    FIELD_BODY, FIELD_ERROR_CODE, FIELD_ERROR_MESSAGE, FIELD_FROM, FIELD_MESSAGE_SID,
    FIELD_MESSAGE_STATUS, FIELD_NUM_MEDIA, FIELD_PROFILE_NAME, FIELD_TO, FIELD_WA_ID,
};

/// Result of classifying an inbound payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// User message carrying text to answer
    Content(ContentMessage),
    /// Delivery status callback
    Status(StatusUpdate),
    /// Neither; acknowledged and logged only
    Unrecognized { reason: &'static str },
}

impl Classification {
    /// Short label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Classification::Content(_) => "content",
            Classification::Status(_) => "status",
            Classification::Unrecognized { .. } => "unrecognized",
        }
    }
}

/// Classify an inbound payload.
///
/// Whitespace-only values count as present.
///
/// - `MessageSid` and `Body` both non-empty → [`Classification::Content`]
/// - `MessageSid` non-empty and `MessageStatus` a known status → [`Classification::Status`]
/// - anything else → [`Classification::Unrecognized`]
pub fn classify(payload: &InboundWebhookPayload) -> Classification {
    let classification = match payload.non_empty(FIELD_MESSAGE_SID) {
        None => Classification::Unrecognized {
            reason: "missing_message_sid",
        },
        Some(message_sid) => match payload.non_empty(FIELD_BODY) {
            Some(body) => Classification::Content(content_message(payload, message_sid, body)),
            None => match payload
                .non_empty(FIELD_MESSAGE_STATUS)
                .and_then(|s| s.parse::<MessageStatus>().ok())
            {
                Some(status) => {
                    Classification::Status(status_update(payload, message_sid, status))
                }
                None if payload.non_empty(FIELD_MESSAGE_STATUS).is_some() => {
                    Classification::Unrecognized {
                        reason: "unknown_message_status",
                    }
                }
                None => Classification::Unrecognized {
                    reason: "no_body_or_status",
                },
            },
        },
    };

    info!(
        kind = classification.kind(),
        message_sid = payload.get(FIELD_MESSAGE_SID).unwrap_or(""),
        field_count = payload.fields().len(),
        "webhook_classified"
    );

    classification
}

fn owned(payload: &InboundWebhookPayload, name: &str) -> String {
    payload.get(name).unwrap_or_default().to_string()
}

fn optional(payload: &InboundWebhookPayload, name: &str) -> Option<String> {
    payload.non_empty(name).map(str::to_string)
}

fn content_message(payload: &InboundWebhookPayload, message_sid: &str, body: &str) -> ContentMessage {
    ContentMessage {
        message_sid: message_sid.to_string(),
        account_sid: owned(payload, FIELD_ACCOUNT_SID),
        from: owned(payload, FIELD_FROM),
        to: owned(payload, FIELD_TO),
        body: body.to_string(),
        num_media: payload
            .get(FIELD_NUM_MEDIA)
            .and_then(|n| n.trim().parse().ok())
            .unwrap_or(0),
        profile_name: optional(payload, FIELD_PROFILE_NAME),
        wa_id: optional(payload, FIELD_WA_ID),
    }
}

fn status_update(
    payload: &InboundWebhookPayload,
    message_sid: &str,
    status: MessageStatus,
) -> StatusUpdate {
    StatusUpdate {
        message_sid: message_sid.to_string(),
        account_sid: owned(payload, FIELD_ACCOUNT_SID),
        from: owned(payload, FIELD_FROM),
        to: owned(payload, FIELD_TO),
        status,
        error_code: optional(payload, FIELD_ERROR_CODE),
        error_message: optional(payload, FIELD_ERROR_MESSAGE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(fields: &[(&str, &str)]) -> InboundWebhookPayload {
        fields.iter().copied().collect()
    }

    #[test]
    fn test_content_message() {
        let result = classify(&payload(&[
            ("MessageSid", "SM1"),
            ("AccountSid", "AC1"),
            ("From", "whatsapp:+15551234567"),
            ("To", "whatsapp:+14155238886"),
            ("Body", "hello"),
            ("NumMedia", "0"),
            ("ProfileName", "Ada"),
            ("WaId", "15551234567"),
        ]));

        match result {
            Classification::Content(msg) => {
                assert_eq!(msg.message_sid, "SM1");
                assert_eq!(msg.from, "whatsapp:+15551234567");
                assert_eq!(msg.body, "hello");
                assert_eq!(msg.num_media, 0);
                assert_eq!(msg.profile_name.as_deref(), Some("Ada"));
                assert_eq!(msg.wa_id.as_deref(), Some("15551234567"));
            }
            other => panic!("Expected content message, got {:?}", other),
        }
    }

    #[test]
    fn test_body_wins_over_status() {
        // Inbound messages also carry SmsStatus/MessageStatus=received
        let result = classify(&payload(&[
            ("MessageSid", "SM1"),
            ("Body", "hi"),
            ("MessageStatus", "received"),
        ]));
        assert_eq!(result.kind(), "content");
    }

    #[test]
    fn test_whitespace_body_is_content() {
        let result = classify(&payload(&[
            ("MessageSid", "SM1"),
            ("From", "whatsapp:+15551234567"),
            ("Body", " "),
        ]));

        match result {
            Classification::Content(msg) => assert_eq!(msg.body, " "),
            other => panic!("Expected content message, got {:?}", other),
        }
    }

    #[test]
    fn test_status_update_with_error() {
        let result = classify(&payload(&[
            ("MessageSid", "SM2"),
            ("MessageStatus", "failed"),
            ("ErrorCode", "30003"),
            ("ErrorMessage", "Unreachable destination handset"),
        ]));

        match result {
            Classification::Status(update) => {
                assert_eq!(update.message_sid, "SM2");
                assert_eq!(update.status, MessageStatus::Failed);
                assert_eq!(update.error_code.as_deref(), Some("30003"));
                assert!(update.is_failure());
            }
            other => panic!("Expected status update, got {:?}", other),
        }
    }

    #[test]
    fn test_status_update_without_error() {
        let result = classify(&payload(&[("MessageSid", "SM3"), ("MessageStatus", "delivered")]));
        match result {
            Classification::Status(update) => {
                assert_eq!(update.status, MessageStatus::Delivered);
                assert!(!update.is_failure());
            }
            other => panic!("Expected status update, got {:?}", other),
        }
    }

    #[test]
    fn test_unrecognized() {
        assert_eq!(
            classify(&payload(&[])),
            Classification::Unrecognized {
                reason: "missing_message_sid"
            }
        );
        assert_eq!(
            classify(&payload(&[("Body", "orphan")])),
            Classification::Unrecognized {
                reason: "missing_message_sid"
            }
        );
        assert_eq!(
            classify(&payload(&[("MessageSid", "SM4"), ("Body", "")])),
            Classification::Unrecognized {
                reason: "no_body_or_status"
            }
        );
        assert_eq!(
            classify(&payload(&[("MessageSid", "SM5"), ("MessageStatus", "bogus")])),
            Classification::Unrecognized {
                reason: "unknown_message_status"
            }
        );
    }
}
