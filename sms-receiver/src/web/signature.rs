//! Twilio webhook signature verification.
//!
//! Twilio signs every webhook with HMAC-SHA1 keyed by the account auth token.
//! Reference: https://www.twilio.com/docs/usage/webhooks/webhooks-security
//!
//! The signed string is the full URL Twilio requested, followed by every POST
//! parameter name and value, sorted by parameter name.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use hmac::{digest::InvalidLength, Hmac, Mac};
use sha1::Sha1;
use url::Url;

type HmacSha1 = Hmac<Sha1>;

/// Header carrying the base64 signature on every Twilio webhook.
pub const TWILIO_SIGNATURE_HEADER: &str = "X-Twilio-Signature";

/// Decides whether a webhook request was signed by the holder of `secret`.
///
/// Implementations must be pure: the same inputs always produce the same
/// answer, and a missing signature is never a match.
pub trait RequestValidator: Send + Sync + 'static {
    fn validate(
        &self,
        secret: &str,
        url: &str,
        params: &BTreeMap<String, String>,
        signature: Option<&str>,
    ) -> bool;
}

/// Twilio's HMAC-SHA1 request validation scheme.
#[derive(Debug, Clone, Copy, Default)]
pub struct TwilioValidator;

impl RequestValidator for TwilioValidator {
    /// Validate a Twilio signature.
    ///
    /// Besides the URL as given, the URL with its default port stripped or
    /// added is also tried, since Twilio may sign either form depending on
    /// how the webhook URL was configured.
    fn validate(
        &self,
        secret: &str,
        url: &str,
        params: &BTreeMap<String, String>,
        signature: Option<&str>,
    ) -> bool {
        let signature = signature.unwrap_or_default();

        url_variants(url).iter().any(|candidate| {
            match compute_signature(secret, candidate, params) {
                Ok(expected) => constant_time_compare(&expected, signature),
                Err(_) => false,
            }
        })
    }
}

/// Compute the base64 HMAC-SHA1 signature Twilio would send for a request.
///
/// `BTreeMap` iteration is ordered by the byte value of the keys, which is
/// the ordering Twilio uses.
pub fn compute_signature(
    secret: &str,
    url: &str,
    params: &BTreeMap<String, String>,
) -> Result<String, InvalidLength> {
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes())?;

    mac.update(canonical_string(url, params).as_bytes());

    Ok(BASE64_STANDARD.encode(mac.finalize().into_bytes()))
}

/// Concatenate the URL with every parameter name and value.
fn canonical_string(url: &str, params: &BTreeMap<String, String>) -> String {
    let mut data = String::from(url);
    for (name, value) in params {
        data.push_str(name);
        data.push_str(value);
    }
    data
}

/// The URL as given, plus the same URL with the scheme's default port
/// toggled (removed when present, added when absent).
fn url_variants(url: &str) -> Vec<String> {
    let mut variants = vec![url.to_string()];
    if let Some(alternate) = toggle_default_port(url) {
        variants.push(alternate);
    }
    variants
}

/// Rewrite the authority of an http(s) URL so that an explicit default port
/// is dropped, or a missing one is added.
///
/// Works on the raw string rather than a re-serialized `Url`, since the
/// signed bytes must otherwise be preserved exactly. Non-default explicit
/// ports are left alone and yield `None`.
fn toggle_default_port(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let default_port: u16 = match parsed.scheme() {
        "http" => 80,
        "https" => 443,
        _ => return None,
    };
    parsed.host_str()?;

    let (scheme, rest) = url.split_once("://")?;
    let authority_end = rest.find(&['/', '?', '#'][..]).unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(authority_end);

    let host_start = authority.rfind('@').map(|i| i + 1).unwrap_or(0);
    let (userinfo, host_port) = authority.split_at(host_start);

    // The last ':' separates the port unless it sits inside an IPv6 literal.
    let (host, port) = match host_port.rfind(':') {
        Some(i) if !host_port[i..].contains(']') => (&host_port[..i], Some(&host_port[i + 1..])),
        _ => (host_port, None),
    };

    match port {
        Some(port) if port.parse::<u16>().ok() == Some(default_port) => {
            Some(format!("{}://{}{}{}", scheme, userinfo, host, tail))
        }
        Some(_) => None,
        None => Some(format!(
            "{}://{}{}:{}{}",
            scheme, userinfo, host, default_port, tail
        )),
    }
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
