use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error body returned by the API on non-success responses, e.g.
/// `{"errors":{"email or password":["is invalid"]}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub errors: BTreeMap<String, Vec<String>>,
}

impl ApiErrorBody {
    /// Flattens the field map into `"<field> <message>; ..."`.
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .flat_map(|(field, messages)| {
                messages
                    .iter()
                    .map(move |message| format!("{field} {message}"))
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Error)]
#[error("api error ({status}): {message}")]
pub struct ApiException {
    pub status: u16,
    pub message: String,
}

impl ApiException {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Builds the exception from a raw response body, falling back to the
    /// raw text when it is not a well-formed error body.
    pub fn from_body(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ApiErrorBody>(body)
            .ok()
            .map(|parsed| parsed.summary())
            .filter(|summary| !summary.is_empty())
            .unwrap_or_else(|| body.trim().to_string());
        Self::new(status, message)
    }
}
