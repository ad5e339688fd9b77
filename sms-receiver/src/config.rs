//! Configuration module for environment variable parsing.
//!
//! Everything is read once at startup. Missing or malformed values fall back
//! to defaults; nothing here fails.

use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use tracing::warn;
use url::Url;

/// Reply sent back to the texter when a message is accepted.
pub const DEFAULT_REPLY_MESSAGE: &str = "Message received. Thank you!";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Twilio auth token used as the HMAC key for webhook signatures.
    ///
    /// When unset every webhook is rejected.
    pub twilio_auth_token: Option<String>,

    /// Address to bind the web server to
    pub host: IpAddr,

    /// Port for the web server to listen on
    pub port: u16,

    /// Externally visible base URL (e.g. `https://sms.example.com`).
    ///
    /// Set this when running behind a proxy that rewrites scheme or host, so
    /// the signed URL can be rebuilt exactly as Twilio requested it.
    pub public_base_url: Option<String>,

    /// Maximum number of messages kept in memory; `None` is unbounded
    pub max_messages: Option<usize>,

    /// Text of the TwiML reply message
    pub reply_message: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            twilio_auth_token: None,
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 5000,
            public_base_url: None,
            max_messages: None,
            reply_message: DEFAULT_REPLY_MESSAGE.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Config {
            // Lowercase spelling kept for existing deployments.
            twilio_auth_token: parse_secret("TWILIO_AUTH_TOKEN")
                .or_else(|| parse_secret("twilio_auth_token")),

            host: parse_or("HOST", defaults.host),

            port: parse_or("PORT", defaults.port),

            public_base_url: parse_base_url("PUBLIC_BASE_URL"),

            // 0 means unbounded
            max_messages: Some(parse_or::<usize>("MAX_MESSAGES", 0)).filter(|&max| max > 0),

            reply_message: env::var("REPLY_MESSAGE")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.reply_message),
        }
    }

    /// Whether webhook signatures can be verified at all.
    pub fn is_signature_verification_enabled(&self) -> bool {
        self.twilio_auth_token.is_some()
    }
}

/// Read a secret, treating blank values as unset.
fn parse_secret(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a value, falling back to `default` when unset or invalid.
fn parse_or<T: FromStr>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}

/// Read an absolute http(s) base URL, dropping any trailing slash.
fn parse_base_url(name: &str) -> Option<String> {
    let raw = env::var(name).ok()?;
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }

    match Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => {
            Some(trimmed.to_string())
        }
        _ => {
            warn!(env_var = name, value = %raw, "Invalid base URL, ignoring");
            None
        }
    }
}
