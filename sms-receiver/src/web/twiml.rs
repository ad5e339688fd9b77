//! TwiML response rendering.
//!
//! Twilio expects webhook responses as TwiML, a small XML vocabulary. Only
//! the `<Message>` reply verb is needed here.

/// Content type for TwiML responses.
pub const TWIML_CONTENT_TYPE: &str = "application/xml";

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Render a response that replies to the sender with `text`.
pub fn message_response(text: &str) -> String {
    format!(
        "{}<Response><Message>{}</Message></Response>",
        XML_DECLARATION,
        escape_xml(text)
    )
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
