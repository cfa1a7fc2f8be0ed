//! Reconstruction of the URL and parameters a webhook was signed over.
//!
//! Twilio signs the exact URL it called, so the URL is rebuilt from the original
//! request target and the raw body bytes, never from re-serialized fields.

use axum::http::{HeaderMap, Uri};

use crate::webhook::{InboundWebhookPayload, SignedParams};

/// What the signature is computed over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureContext {
    /// scheme + host + path + original query string
    pub url: String,
    /// Every form parameter, repeats included
    pub params: SignedParams,
}

impl SignatureContext {
    /// Build the context for a request.
    ///
    /// Scheme and host come from `public_base_url` when configured, otherwise
    /// from `X-Forwarded-Proto` / `X-Forwarded-Host` / `Host` (scheme defaults
    /// to `http`). Path and query always come from the request target.
    pub fn from_request(
        headers: &HeaderMap,
        uri: &Uri,
        payload: &InboundWebhookPayload,
        public_base_url: Option<&str>,
    ) -> Self {
        let path_and_query = uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| uri.path());

        let base = match public_base_url {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => {
                let scheme = first_header_value(headers, "x-forwarded-proto")
                    .or_else(|| uri.scheme_str())
                    .unwrap_or("http");
                let host = first_header_value(headers, "x-forwarded-host")
                    .or_else(|| first_header_value(headers, "host"))
                    .or_else(|| uri.authority().map(|a| a.as_str()))
                    .unwrap_or("localhost");
                format!("{}://{}", scheme, host)
            }
        };

        Self {
            url: format!("{}{}", base, path_and_query),
            params: payload.signed_params(),
        }
    }
}

/// First comma-separated value of a header, trimmed.
fn first_header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for &(k, v) in pairs {
            map.insert(k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn test_url_from_host_header() {
        let payload = InboundWebhookPayload::from_form_bytes(b"Body=hi&MessageSid=SM1");
        let ctx = SignatureContext::from_request(
            &headers(&[("host", "bot.example.com:3000")]),
            &"/webhooks/whatsapp?source=test&x=%20y".parse::<Uri>().unwrap(),
            &payload,
            None,
        );

        assert_eq!(ctx.url, "http://bot.example.com:3000/webhooks/whatsapp?source=test&x=%20y");
        assert_eq!(ctx.params.len(), 2);
        assert!(ctx.params["Body"].contains("hi"));
    }

    #[test]
    fn test_url_from_forwarded_headers() {
        let ctx = SignatureContext::from_request(
            &headers(&[
                ("host", "10.0.0.5:3000"),
                ("x-forwarded-proto", "https, http"),
                ("x-forwarded-host", "bot.example.com"),
            ]),
            &"/webhooks/whatsapp".parse::<Uri>().unwrap(),
            &InboundWebhookPayload::default(),
            None,
        );

        assert_eq!(ctx.url, "https://bot.example.com/webhooks/whatsapp");
        assert!(ctx.params.is_empty());
    }

    #[test]
    fn test_url_from_public_base() {
        let ctx = SignatureContext::from_request(
            &headers(&[("host", "internal:3000")]),
            &"/webhooks/whatsapp/status?a=1".parse::<Uri>().unwrap(),
            &InboundWebhookPayload::default(),
            Some("https://abc.ngrok.io/"),
        );

        assert_eq!(ctx.url, "https://abc.ngrok.io/webhooks/whatsapp/status?a=1");
    }
}
