//! Request and outcome types for the send-text endpoint.

use serde::Serialize;
use serde_json::Value;

/// Body of `POST {base_url}/sendText`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTextRequest {
    /// Target chat, e.g. `"34600111222@c.us"`.
    pub chat_id: String,
    /// The message text.
    pub text: String,
    /// WhatsApp session to send from.
    pub session: String,
}

impl SendTextRequest {
    /// Build a request for a phone number or chat id.
    pub fn new(phone: &str, text: impl Into<String>, session: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id(phone),
            text: text.into(),
            session: session.into(),
        }
    }
}

/// Result of a single send, with every failure mode folded in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The gateway accepted the message.
    Sent {
        /// Gateway-assigned message id, when the response carried one.
        message_id: Option<String>,
    },
    /// The message was not sent.
    Failed {
        /// Human-readable reason.
        error: String,
    },
}

impl SendOutcome {
    /// Whether the message was accepted.
    pub fn is_sent(&self) -> bool {
        matches!(self, SendOutcome::Sent { .. })
    }

    /// Gateway message id, if any.
    pub fn message_id(&self) -> Option<&str> {
        match self {
            SendOutcome::Sent { message_id } => message_id.as_deref(),
            SendOutcome::Failed { .. } => None,
        }
    }

    /// Failure reason, if any.
    pub fn error(&self) -> Option<&str> {
        match self {
            SendOutcome::Sent { .. } => None,
            SendOutcome::Failed { error } => Some(error),
        }
    }
}

/// Canonical form of a phone number: the digits only, or the trimmed value
/// when it is already a chat id.
///
/// Two numbers with the same canonical form reach the same chat.
pub fn normalize_phone(phone: &str) -> String {
    let phone = phone.trim();
    if phone.contains('@') {
        return phone.to_string();
    }
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Convert a phone number into a WhatsApp chat id.
///
/// Values that already contain `@` are treated as chat ids and returned as-is.
/// Otherwise every non-digit is dropped and `@c.us` is appended.
pub fn chat_id(phone: &str) -> String {
    let phone = normalize_phone(phone);
    if phone.contains('@') {
        return phone;
    }
    format!("{}@c.us", phone)
}

/// Pull a message id out of a success body.
pub(crate) fn extract_message_id(body: &Value) -> Option<String> {
    match body.get("id") {
        Some(Value::String(id)) => return Some(id.clone()),
        Some(Value::Object(id)) => {
            if let Some(Value::String(serialized)) = id.get("_serialized") {
                return Some(serialized.clone());
            }
        }
        _ => {}
    }
    body.get("key")
        .and_then(|key| key.get("id"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Pull a human-readable error out of a structured failure body.
pub(crate) fn extract_error_message(body: &Value) -> Option<String> {
    if let Some(message) = body.get("message").and_then(Value::as_str) {
        return Some(message.to_string());
    }
    match body.get("error") {
        Some(Value::String(error)) => Some(error.clone()),
        Some(error) => error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        None => None,
    }
}
