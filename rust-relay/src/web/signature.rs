//! Twilio webhook signature verification.
//!
//! Twilio signs webhook requests using HMAC-SHA1 over the full callback URL
//! followed by every POST parameter, sorted by name, as `name + value`. A
//! repeated parameter contributes each distinct value, in sorted order.
//! Reference: https://www.twilio.com/docs/usage/security#validating-requests

use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::webhook::SignedParams;

type HmacSha1 = Hmac<Sha1>;

/// Header carrying the caller's signature.
pub const SIGNATURE_HEADER: &str = "x-twilio-signature";

/// Verify a Twilio webhook signature.
///
/// # Arguments
///
/// * `url` - The full callback URL, including the original query string
/// * `params` - Every form parameter of the request
/// * `signature` - The `X-Twilio-Signature` header value
/// * `shared_secret` - Twilio auth token used as the HMAC key
///
/// # Returns
///
/// `true` if the signature matches, or if no secret is configured (verification
/// is skipped). `false` otherwise.
pub fn verify_twilio_signature(
    url: &str,
    params: &SignedParams,
    signature: &str,
    shared_secret: Option<&str>,
) -> bool {
    let secret = match shared_secret {
        Some(s) if is_signature_verification_enabled(shared_secret) => s,
        _ => {
            warn!("twilio_signature_check_skipped_no_secret");
            return true;
        }
    };

    let expected_signature = match compute_signature(secret, url, params) {
        Some(sig) => sig,
        None => {
            warn!("twilio_signature_invalid_key");
            return false;
        }
    };

    // Constant-time comparison to prevent timing attacks
    let valid: bool = expected_signature
        .as_bytes()
        .ct_eq(signature.trim().as_bytes())
        .into();

    if !valid {
        warn!(
            url = %url,
            signature = %signature,
            expected_length = expected_signature.len(),
            actual_length = signature.len(),
            "twilio_signature_mismatch"
        );
    }

    valid
}

/// Compute the base64 HMAC-SHA1 signature Twilio would send for this request.
///
/// Both keys and values iterate in sorted order, which is the order Twilio uses.
pub fn compute_signature(secret: &str, url: &str, params: &SignedParams) -> Option<String> {
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes()).ok()?;

    mac.update(url.as_bytes());
    for (key, values) in params {
        for value in values {
            mac.update(key.as_bytes());
            mac.update(value.as_bytes());
        }
    }

    Some(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Check if signature verification is enabled.
pub fn is_signature_verification_enabled(secret: Option<&str>) -> bool {
    secret.map(|k| !k.trim().is_empty()).unwrap_or(false)
}
