//! Uniform `{message, data, status}` reply envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reply envelope used for every JSON success and error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Operation or error label.
    pub message: String,
    /// Textual payload. Structured values are carried as serialised JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// Optional status code echoed to the client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl Envelope {
    /// Envelope with only a message and status, used for errors.
    #[must_use]
    pub fn error(message: impl Into<String>, status: u16) -> Self {
        Self {
            message: message.into(),
            data: None,
            status: Some(status),
        }
    }
}

/// Builds an envelope for `kind`.
///
/// Strings pass through unchanged. Every other value, including numbers,
/// lists and maps, is embedded as its compact JSON text.
#[must_use]
pub fn format_msg(kind: &str, payload: &Value, status: Option<u16>) -> Envelope {
    let data = match payload {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    Envelope {
        message: kind.to_owned(),
        data: Some(data),
        status,
    }
}
