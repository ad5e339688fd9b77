//! SMS Receiver web server.
//!
//! This binary:
//! - Receives inbound SMS webhooks from Twilio
//! - Verifies the `X-Twilio-Signature` header
//! - Keeps message bodies in memory and serves them at `/get_messages`
//! - Serves a landing page that polls the message list

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sms_receiver::{router, AppState, Config, MessageStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        host = %config.host,
        port = config.port,
        twilio_auth_token_configured = config.is_signature_verification_enabled(),
        public_base_url = ?config.public_base_url,
        max_messages = ?config.max_messages,
        "config_loaded"
    );

    if !config.is_signature_verification_enabled() {
        warn!(
            env_var = "TWILIO_AUTH_TOKEN",
            effect = "all /sms requests rejected with 403",
            "twilio_auth_token_missing"
        );
    }

    let store = MessageStore::with_max_messages(config.max_messages);
    let addr = SocketAddr::new(config.host, config.port);

    // Create application state and router
    let state = AppState::new(config, store);
    let app = router(state);

    // Bind to address
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "ctrl_c_handler_failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "sigterm_handler_failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
