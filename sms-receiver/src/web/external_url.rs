//! Reconstruction of the URL a webhook caller actually requested.
//!
//! Twilio signs the public URL it called, which is rarely what the server
//! sees once a proxy or load balancer has rewritten scheme and host.

use axum::http::{header::HOST, HeaderMap, Uri};
use thiserror::Error;

const FORWARDED_PROTO: &str = "x-forwarded-proto";
const FORWARDED_HOST: &str = "x-forwarded-host";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExternalUrlError {
    #[error("request carries no Host or X-Forwarded-Host header")]
    MissingHost,
}

/// Build the externally visible URL for a request.
///
/// A configured `public_base_url` wins. Otherwise scheme and host come from
/// `X-Forwarded-Proto` / `X-Forwarded-Host` when present, falling back to
/// plain `http` and the `Host` header.
pub fn external_url(
    public_base_url: Option<&str>,
    headers: &HeaderMap,
    uri: &Uri,
) -> Result<String, ExternalUrlError> {
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    if let Some(base) = public_base_url {
        return Ok(format!("{}{}", base.trim_end_matches('/'), path_and_query));
    }

    let scheme = first_header_value(headers, FORWARDED_PROTO).unwrap_or("http");
    let host = first_header_value(headers, FORWARDED_HOST)
        .or_else(|| first_header_value(headers, HOST.as_str()))
        .ok_or(ExternalUrlError::MissingHost)?;

    Ok(format!("{}://{}{}", scheme, host, path_and_query))
}

/// First comma-separated entry of a header, as appended by proxy chains.
fn first_header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
