//! HTTP endpoint handlers.
//!
//! The webhook handler only verifies the Twilio signature, records the
//! message body and answers with TwiML. Listing and the landing page read
//! the shared store directly.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::FormRejection, Form, OriginalUri, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::store::MessageStore;
use crate::web::external_url::external_url;
use crate::web::signature::{RequestValidator, TwilioValidator, TWILIO_SIGNATURE_HEADER};
use crate::web::twiml::{message_response, TWIML_CONTENT_TYPE};
use crate::Config;

/// Form field holding the text of an inbound SMS.
pub const BODY_FIELD: &str = "Body";

const INDEX_HTML: &str = include_str!("../../assets/index.html");

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: MessageStore,
    pub validator: Arc<dyn RequestValidator>,
}

impl AppState {
    pub fn new(config: Config, store: MessageStore) -> Self {
        Self::with_validator(config, store, TwilioValidator)
    }

    pub fn with_validator(
        config: Config,
        store: MessageStore,
        validator: impl RequestValidator,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            validator: Arc::new(validator),
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Twilio SMS Webhook
// =============================================================================

/// Twilio inbound SMS webhook.
///
/// This endpoint:
/// 1. Verifies the `X-Twilio-Signature` header against the public URL
/// 2. Records the `Body` field
/// 3. Replies with a TwiML acknowledgment
///
/// A body that is not a readable form is verified as an empty parameter set,
/// so unsigned requests are always answered with 403. An absent `Body`
/// field is acknowledged but not recorded.
pub async fn sms_webhook(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    form: Result<Form<Vec<(String, String)>>, FormRejection>,
) -> Response {
    let params = match form {
        Ok(Form(pairs)) => first_values(pairs),
        Err(rejection) => {
            debug!(error = %rejection, "sms_form_unreadable");
            BTreeMap::new()
        }
    };

    let signature = headers
        .get(TWILIO_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    info!(
        param_count = params.len(),
        has_signature = signature.is_some(),
        "sms_webhook_received"
    );

    let Some(auth_token) = state.config.twilio_auth_token.as_deref() else {
        warn!("sms_auth_token_not_configured");
        return StatusCode::FORBIDDEN.into_response();
    };

    let url = match external_url(state.config.public_base_url.as_deref(), &headers, &uri) {
        Ok(url) => url,
        Err(e) => {
            warn!(error = %e, "sms_external_url_unresolved");
            return StatusCode::FORBIDDEN.into_response();
        }
    };

    if !state.validator.validate(auth_token, &url, &params, signature) {
        warn!(
            url = %url,
            has_signature = signature.is_some(),
            "sms_signature_invalid"
        );
        return StatusCode::FORBIDDEN.into_response();
    }

    match params.get(BODY_FIELD) {
        Some(body) => {
            let stored = state.store.push(body.clone()).await;
            info!(
                body_length = body.len(),
                stored_messages = stored,
                "sms_message_recorded"
            );
        }
        None => {
            warn!("sms_body_missing");
        }
    }

    (
        StatusCode::OK,
        [(CONTENT_TYPE, TWIML_CONTENT_TYPE)],
        message_response(&state.config.reply_message),
    )
        .into_response()
}

/// Collapse repeated form keys, keeping the first value of each.
fn first_values(pairs: Vec<(String, String)>) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    for (name, value) in pairs {
        params.entry(name).or_insert(value);
    }
    params
}

// =============================================================================
// Message Board
// =============================================================================

/// All recorded messages, oldest first.
pub async fn get_messages(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.store.snapshot().await)
}

/// Landing page; fetches `/get_messages` from the browser.
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
