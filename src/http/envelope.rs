//! JSON envelopes exchanged on `/proxy` and `/health`.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Method used when the caller does not name one.
pub const DEFAULT_METHOD: &str = "POST";

/// Methods matched case-insensitively and sent upper-cased.
const NORMALIZED_METHODS: [&str; 6] = ["DELETE", "GET", "HEAD", "OPTIONS", "POST", "PUT"];

/// Body of an inbound `/proxy` call.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProxyRequest {
    /// Target URL. Required; an empty string counts as missing.
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub method: Option<String>,

    /// Headers merged over the default `Content-Type: application/json`.
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,

    /// Either a raw string or any JSON value to serialize.
    #[serde(default)]
    pub body: Option<Value>,
}

impl ProxyRequest {
    /// Target URL, treating `""` as absent.
    pub fn target_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|url| !url.is_empty())
    }

    /// Outbound method, `POST` when unset or empty.
    ///
    /// The common methods are upper-cased; anything else (`patch`, custom
    /// verbs) goes out exactly as given.
    pub fn method(&self) -> String {
        let method = self
            .method
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_METHOD);

        NORMALIZED_METHODS
            .iter()
            .find(|known| known.eq_ignore_ascii_case(method))
            .map_or_else(|| method.to_string(), |known| known.to_string())
    }

    /// Outbound body text.
    ///
    /// Falsy values (`null`, `""`, `false`, `0`) send no body. Strings are
    /// sent verbatim, anything else as its JSON text.
    pub fn outbound_body(&self) -> Option<String> {
        match self.body.as_ref()? {
            Value::Null | Value::Bool(false) => None,
            Value::String(s) if s.is_empty() => None,
            Value::Number(n) if n.as_f64() == Some(0.0) => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Upstream response relayed back to the caller.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProxyResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    /// Raw upstream body text, unmodified.
    pub body: String,
}

/// `/health` payload.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub mtls: bool,
    pub timestamp: String,
}
