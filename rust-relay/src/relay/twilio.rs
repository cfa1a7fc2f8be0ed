//! Twilio Messages REST client.
//!
//! Reference: https://www.twilio.com/docs/messaging/api/message-resource#create-a-message-resource

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use super::error::RelayError;
use super::provider::{MessagingProvider, OutboundReplyReceipt};
use crate::Config;

/// Twilio REST API client for sending WhatsApp messages.
#[derive(Clone)]
pub struct TwilioClient {
    client: Client,
    api_base: String,
    account_sid: String,
    auth_token: String,
}

/// Successful "create message" response body.
#[derive(Debug, Deserialize)]
struct TwilioMessageResponse {
    sid: String,
    status: String,
    to: String,
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    date_created: Option<String>,
    #[serde(default)]
    date_sent: Option<String>,
    #[serde(default)]
    date_updated: Option<String>,
}

/// Error response body.
#[derive(Debug, Deserialize)]
struct TwilioApiError {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    more_info: Option<String>,
}

impl TwilioClient {
    /// Create a client from the process configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_base: config.twilio_api_base.clone(),
            account_sid: config.twilio_account_sid.clone(),
            auth_token: config.twilio_auth_token.clone(),
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, self.account_sid
        )
    }
}

#[async_trait]
impl MessagingProvider for TwilioClient {
    async fn send(
        &self,
        to: &str,
        from: &str,
        body: &str,
    ) -> Result<OutboundReplyReceipt, RelayError> {
        info!(to = %to, from = %from, body_length = body.len(), "twilio_send_starting");

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", from), ("Body", body)])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let api_error: Option<TwilioApiError> = serde_json::from_str(&text).ok();
            let (code, message, more_info) = match api_error {
                Some(e) => (e.code.unwrap_or(0), e.message, e.more_info),
                None => (0, None, None),
            };

            warn!(
                http_status = status.as_u16(),
                code = code,
                more_info = ?more_info,
                "twilio_send_rejected"
            );

            return Err(RelayError::Api {
                status: status.as_u16(),
                code,
                message: message.unwrap_or_else(|| text.chars().take(200).collect()),
            });
        }

        let parsed: TwilioMessageResponse =
            serde_json::from_str(&text).map_err(|e| RelayError::Parse(e.to_string()))?;

        let receipt = into_receipt(parsed, Utc::now());

        info!(sid = %receipt.sid, status = %receipt.status, "twilio_send_complete");

        Ok(receipt)
    }
}

/// Convert the API response, filling missing creation/update times with `now`.
fn into_receipt(response: TwilioMessageResponse, now: DateTime<Utc>) -> OutboundReplyReceipt {
    OutboundReplyReceipt {
        sid: response.sid,
        status: response.status,
        body: response.body.unwrap_or_default(),
        from: response.from.unwrap_or_default(),
        to: response.to,
        date_created: parse_twilio_date(response.date_created.as_deref()).unwrap_or(now),
        date_updated: parse_twilio_date(response.date_updated.as_deref()).unwrap_or(now),
        date_sent: parse_twilio_date(response.date_sent.as_deref()),
    }
}

/// Twilio serializes dates as RFC 2822 strings.
fn parse_twilio_date(raw: Option<&str>) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw?)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
