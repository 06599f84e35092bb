// src/price/proxy.rs
//! Proxy strategies: how a target URL is wrapped for a relay, and how the
//! relay's envelope (if any) is peeled off the response.

use serde::Deserialize;
use serde_json::Value;

use crate::error::ParseError;

/// How the target URL is appended to the proxy prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlWrap {
    /// Percent-encode the whole target URL.
    Encoded,
    /// Append the target URL unchanged.
    Raw,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProxyStrategy {
    pub id: String,
    pub prefix: String,
    pub wrap: UrlWrap,
    /// Field holding the provider response when the relay wraps it.
    #[serde(default)]
    pub envelope: Option<String>,
}

impl ProxyStrategy {
    pub fn new(id: &str, prefix: &str, wrap: UrlWrap) -> Self {
        Self {
            id: id.to_string(),
            prefix: prefix.to_string(),
            wrap,
            envelope: None,
        }
    }

    pub fn with_envelope(mut self, field: &str) -> Self {
        self.envelope = Some(field.to_string());
        self
    }

    pub fn defaults() -> Vec<ProxyStrategy> {
        vec![
            ProxyStrategy::new(
                "allorigins",
                "https://api.allorigins.win/get?url=",
                UrlWrap::Encoded,
            )
            .with_envelope("contents"),
            ProxyStrategy::new("corsproxy", "https://corsproxy.io/?", UrlWrap::Raw),
            ProxyStrategy::new(
                "codetabs",
                "https://api.codetabs.com/v1/proxy?quest=",
                UrlWrap::Raw,
            ),
        ]
    }

    pub fn wrap_url(&self, target: &str) -> String {
        match self.wrap {
            UrlWrap::Encoded => format!("{}{}", self.prefix, urlencoding::encode(target)),
            UrlWrap::Raw => format!("{}{}", self.prefix, target),
        }
    }

    /// Parse the relay body and return the provider payload, unwrapping one
    /// envelope level when this strategy declares one.
    pub fn unwrap_body(&self, body: &str) -> Result<Value, ParseError> {
        let outer: Value = serde_json::from_str(body)?;
        let Some(field) = self.envelope.as_deref() else {
            return Ok(outer);
        };
        match outer.get(field) {
            Some(Value::String(inner)) => Ok(serde_json::from_str(inner)?),
            Some(inner @ Value::Object(_)) => Ok(inner.clone()),
            _ => Err(ParseError::Envelope(field.to_string())),
        }
    }
}
