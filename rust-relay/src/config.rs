//! Configuration module for environment variable parsing.
//!
//! Configuration is read once at process start. Missing Twilio credentials are
//! fatal: the server refuses to start rather than accept webhooks it can't answer.

use std::env;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

/// Default Twilio REST API base URL.
pub const DEFAULT_TWILIO_API_BASE: &str = "https://api.twilio.com";

/// Default HTTP port when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 3000;

/// Default timeout for outbound provider calls, in milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Errors raised while loading configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("invalid PORT: {0} (must be a number between 1 and 65535)")]
    InvalidPort(String),
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Twilio account SID, also the basic-auth username for the REST API
    pub twilio_account_sid: String,

    /// Twilio auth token, the basic-auth password for the REST API
    pub twilio_auth_token: String,

    /// Default WhatsApp sender number (with or without the `whatsapp:` prefix)
    pub twilio_phone_number: String,

    /// Shared secret for `X-Twilio-Signature` verification.
    ///
    /// When unset, signatures are not checked at all.
    pub twilio_webhook_secret: Option<String>,

    /// Port for the web server to listen on
    pub port: u16,

    /// Base URL of the Twilio REST API
    pub twilio_api_base: String,

    /// Timeout for outbound provider calls
    pub request_timeout_ms: u64,

    /// Public base URL (scheme + host) the provider uses to reach us.
    ///
    /// Overrides the Host / X-Forwarded-* headers when rebuilding the signed URL.
    pub public_base_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let account_sid = get("TWILIO_ACCOUNT_SID");
        let auth_token = get("TWILIO_AUTH_TOKEN");
        let phone_number = get("TWILIO_PHONE_NUMBER");

        let mut missing = Vec::new();
        if account_sid.is_none() {
            missing.push("TWILIO_ACCOUNT_SID");
        }
        if auth_token.is_none() {
            missing.push("TWILIO_AUTH_TOKEN");
        }
        if phone_number.is_none() {
            missing.push("TWILIO_PHONE_NUMBER");
        }

        let (Some(twilio_account_sid), Some(twilio_auth_token), Some(twilio_phone_number)) =
            (account_sid, auth_token, phone_number)
        else {
            return Err(ConfigError::Missing(missing));
        };

        let port = match get("PORT") {
            Some(raw) => parse_port(&raw)?,
            None => DEFAULT_PORT,
        };

        let request_timeout_ms = match get("REQUEST_TIMEOUT_MS") {
            Some(raw) => parse_timeout_ms(&raw),
            None => DEFAULT_REQUEST_TIMEOUT_MS,
        };

        Ok(Config {
            twilio_account_sid,
            twilio_auth_token,
            twilio_phone_number,
            twilio_webhook_secret: get("TWILIO_WEBHOOK_SECRET"),
            port,
            twilio_api_base: get("TWILIO_API_BASE")
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_TWILIO_API_BASE.to_string()),
            request_timeout_ms,
            public_base_url: get("PUBLIC_BASE_URL")
                .map(|base| base.trim_end_matches('/').to_string()),
        })
    }

    /// Outbound request timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Whether webhook signature verification is active.
    pub fn signature_verification_enabled(&self) -> bool {
        self.twilio_webhook_secret.is_some()
    }
}

fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    match raw.trim().parse::<u16>() {
        Ok(port) if port >= 1 => Ok(port),
        _ => Err(ConfigError::InvalidPort(raw.to_string())),
    }
}

/// Zero or unparsable values fall back to the default.
fn parse_timeout_ms(raw: &str) -> u64 {
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => ms,
        _ => {
            warn!(value = %raw, "request_timeout_invalid_using_default");
            DEFAULT_REQUEST_TIMEOUT_MS
        }
    }
}
