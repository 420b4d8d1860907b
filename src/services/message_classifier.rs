//! Decides whether a message body carries a structured payload or plain text.

use serde::Serialize;
use serde_json::Value;

use super::dm_types::DirectMessage;

/// How a message body should be rendered.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum MessageContent {
    /// JSON payload with a recognized non-negative `type`.
    Structured(Value),
    /// Anything else, shown verbatim.
    Text(String),
}

impl MessageContent {
    pub fn is_structured(&self) -> bool {
        matches!(self, MessageContent::Structured(_))
    }

    /// The payload's `type` field, if structured.
    pub fn payload_type(&self) -> Option<i64> {
        match self {
            MessageContent::Structured(value) => value.get("type").and_then(Value::as_i64),
            MessageContent::Text(_) => None,
        }
    }
}

pub fn classify(body: &str) -> MessageContent {
    match serde_json::from_str::<Value>(body) {
        Ok(value) if has_recognized_type(&value) => MessageContent::Structured(value),
        _ => MessageContent::Text(body.to_string()),
    }
}

fn has_recognized_type(value: &Value) -> bool {
    value
        .get("type")
        .and_then(Value::as_f64)
        .is_some_and(|t| t >= 0.0)
}

/// A stored message paired with its render classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedMessage {
    pub message: DirectMessage,
    pub content: MessageContent,
}

impl From<&DirectMessage> for RenderedMessage {
    fn from(message: &DirectMessage) -> Self {
        Self {
            content: classify(&message.body),
            message: message.clone(),
        }
    }
}
