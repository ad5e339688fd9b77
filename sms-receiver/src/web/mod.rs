//! Web server module.
//!
//! This module provides:
//! - The Twilio SMS webhook, guarded by signature verification
//! - A JSON listing of every recorded message
//! - A landing page that polls the listing
//!
//! Messages live in an in-memory [`MessageStore`](crate::MessageStore)
//! injected through [`AppState`].

pub mod external_url;
pub mod handlers;
pub mod signature;
pub mod twiml;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use external_url::{external_url, ExternalUrlError};
pub use handlers::{get_messages, health, index, sms_webhook, AppState, HealthResponse, BODY_FIELD};
pub use signature::{compute_signature, RequestValidator, TwilioValidator, TWILIO_SIGNATURE_HEADER};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/sms", post(sms_webhook))
        .route("/get_messages", get(get_messages))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use axum::body::{to_bytes, Body};
    use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::{Config, MessageStore};

    const AUTH_TOKEN: &str = "test-token";
    const HOST: &str = "example.com";

    fn test_state() -> AppState {
        let config = Config {
            twilio_auth_token: Some(AUTH_TOKEN.to_string()),
            ..Config::default()
        };
        AppState::new(config, MessageStore::new())
    }

    fn sign(url: &str, params: &[(&str, &str)]) -> String {
        let params: BTreeMap<String, String> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        compute_signature(AUTH_TOKEN, url, &params).unwrap()
    }

    fn sms_request(form: &str, signature: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/sms")
            .header("host", HOST)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(signature) = signature {
            builder = builder.header(TWILIO_SIGNATURE_HEADER, signature);
        }
        builder.body(Body::from(form.to_string())).unwrap()
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn listed_messages(app: Router) -> Vec<String> {
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/get_messages")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        serde_json::from_str(&body_string(response).await).unwrap()
    }

    #[tokio::test]
    async fn test_valid_sms_is_recorded_and_listed() {
        let state = test_state();
        let app = router(state.clone());
        let signature = sign(
            "http://example.com/sms",
            &[("Body", "Hello"), ("From", "+15551234567")],
        );

        let response = app
            .clone()
            .oneshot(sms_request(
                "Body=Hello&From=%2B15551234567",
                Some(signature.as_str()),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/xml"
        );
        let body = body_string(response).await;
        assert!(body.contains("<Message>Message received. Thank you!</Message>"));

        assert_eq!(listed_messages(app).await, vec!["Hello".to_string()]);
        assert_eq!(state.store.len().await, 1);
    }

    #[tokio::test]
    async fn test_invalid_signature_is_forbidden() {
        let state = test_state();
        let app = router(state.clone());

        let response = app
            .clone()
            .oneshot(sms_request("Body=Hello", Some("bm90LWEtc2lnbmF0dXJl")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(body_string(response).await.is_empty());
        assert!(listed_messages(app).await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_signature_is_forbidden() {
        let state = test_state();
        let app = router(state.clone());

        let response = app.oneshot(sms_request("Body=Hello", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(state.store.is_empty().await);
    }

    #[tokio::test]
    async fn test_unconfigured_token_rejects_everything() {
        let state = AppState::new(Config::default(), MessageStore::new());
        let app = router(state.clone());
        let signature = sign("http://example.com/sms", &[("Body", "Hello")]);

        let response = app
            .oneshot(sms_request("Body=Hello", Some(signature.as_str())))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(state.store.is_empty().await);
    }

    #[tokio::test]
    async fn test_missing_body_is_acknowledged_but_not_recorded() {
        let state = test_state();
        let app = router(state.clone());
        let signature = sign("http://example.com/sms", &[("From", "+15551234567")]);

        let response = app
            .oneshot(sms_request("From=%2B15551234567", Some(signature.as_str())))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.store.is_empty().await);
    }

    #[tokio::test]
    async fn test_empty_body_is_recorded() {
        let state = test_state();
        let app = router(state.clone());
        let signature = sign("http://example.com/sms", &[("Body", "")]);

        let response = app
            .oneshot(sms_request("Body=", Some(signature.as_str())))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.store.snapshot().await, vec![String::new()]);
    }

    #[tokio::test]
    async fn test_signature_checked_against_public_base_url() {
        let config = Config {
            twilio_auth_token: Some(AUTH_TOKEN.to_string()),
            public_base_url: Some("https://sms.example.org".to_string()),
            ..Config::default()
        };
        let state = AppState::new(config, MessageStore::new());
        let app = router(state.clone());

        let internal = sign("http://example.com/sms", &[("Body", "Hi")]);
        let response = app
            .clone()
            .oneshot(sms_request("Body=Hi", Some(internal.as_str())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let public = sign("https://sms.example.org/sms", &[("Body", "Hi")]);
        let response = app
            .oneshot(sms_request("Body=Hi", Some(public.as_str())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.store.snapshot().await, vec!["Hi".to_string()]);
    }

    #[tokio::test]
    async fn test_messages_listed_in_arrival_order() {
        let state = test_state();
        let app = router(state.clone());

        for text in ["a", "b"] {
            let signature = sign("http://example.com/sms", &[("Body", text)]);
            let response = app
                .clone()
                .oneshot(sms_request(&format!("Body={}", text), Some(signature.as_str())))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        assert_eq!(
            listed_messages(app).await,
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[tokio::test]
    async fn test_custom_validator_is_used() {
        struct AcceptAll;

        impl RequestValidator for AcceptAll {
            fn validate(
                &self,
                _secret: &str,
                _url: &str,
                _params: &BTreeMap<String, String>,
                _signature: Option<&str>,
            ) -> bool {
                true
            }
        }

        let config = Config {
            twilio_auth_token: Some(AUTH_TOKEN.to_string()),
            ..Config::default()
        };
        let state = AppState::with_validator(config, MessageStore::new(), AcceptAll);
        let app = router(state.clone());

        let response = app
            .oneshot(sms_request("Body=trusted", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.store.snapshot().await, vec!["trusted".to_string()]);
    }

    #[tokio::test]
    async fn test_index_serves_html() {
        let app = router(test_state());

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers().get(CONTENT_TYPE).unwrap().to_str().unwrap();
        assert!(content_type.starts_with("text/html"));
        assert!(body_string(response).await.contains("/get_messages"));
    }

    #[tokio::test]
    async fn test_unsigned_non_form_posts_are_forbidden() {
        let state = test_state();
        let app = router(state.clone());

        let no_content_type = Request::builder()
            .method("POST")
            .uri("/sms")
            .header("host", HOST)
            .body(Body::from("Body=Hello"))
            .unwrap();
        let response = app.clone().oneshot(no_content_type).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(body_string(response).await.is_empty());

        let json_body = Request::builder()
            .method("POST")
            .uri("/sms")
            .header("host", HOST)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"Body":"Hello"}"#))
            .unwrap();
        let response = app.oneshot(json_body).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        assert!(state.store.is_empty().await);
    }

    #[tokio::test]
    async fn test_duplicate_body_field_records_first_value() {
        let state = test_state();
        let app = router(state.clone());
        let signature = sign("http://example.com/sms", &[("Body", "first")]);

        let response = app
            .oneshot(sms_request(
                "Body=first&Body=second",
                Some(signature.as_str()),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.store.snapshot().await, vec!["first".to_string()]);
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(test_state());

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, r#"{"status":"ok"}"#);
    }
}
