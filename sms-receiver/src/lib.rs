//! SMS Receiver - Twilio inbound SMS webhook receiver.
//!
//! This library provides the pieces of the `sms-receiver` binary:
//! - `web`: routes, Twilio signature verification and TwiML replies
//! - `store`: the shared in-memory message list
//! - `config`: environment configuration
//!
//! ## Request Flow
//!
//! ```text
//! Twilio → POST /sms → signature check → MessageStore ← GET /get_messages ← browser
//! ```

pub mod config;
pub mod store;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use store::MessageStore;
pub use web::{router, AppState, RequestValidator, TwilioValidator};
