//! Coverage control signals and the per-request context that carries them.
//!
//! Signals arrive either as `X-Codeception-CodeCoverage*` request headers or
//! as a JSON object in the `CODECEPTION_CODECOVERAGE` cookie. Both transports
//! are normalized into CGI-style metadata keys (`HTTP_X_CODECEPTION_*`) held
//! by an explicit [`RequestContext`] that is passed down the request path.

use axum::http::{header, HeaderMap};
use percent_encoding::percent_decode_str;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Prefix of every normalized signal key
pub const METADATA_PREFIX: &str = "HTTP_X_CODECEPTION_";

/// Cookie carrying JSON-encoded signals
pub const SIGNAL_COOKIE: &str = "CODECEPTION_CODECOVERAGE";

/// Cookie set when a fatal error occurred
pub const ERROR_COOKIE: &str = "CODECEPTION_CODECOVERAGE_ERROR";

/// Response header set when a fatal error occurred
pub const ERROR_HEADER: &str = "x-codeception-codecoverage-error";

const HEADER_PREFIX: &str = "x-codeception-";

/// Coverage control signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Arms collection; the value is the test-run label
    Coverage,
    /// Alternate config file name, or an explicit config path
    Config,
    /// Named test suite whose coverage settings apply
    Suite,
    /// Debug mode: never persist, never terminate
    Debug,
}

impl Signal {
    /// Normalized metadata key for this signal
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Coverage => "HTTP_X_CODECEPTION_CODECOVERAGE",
            Self::Config => "HTTP_X_CODECEPTION_CODECOVERAGE_CONFIG",
            Self::Suite => "HTTP_X_CODECEPTION_CODECOVERAGE_SUITE",
            Self::Debug => "HTTP_X_CODECEPTION_CODECOVERAGE_DEBUG",
        }
    }
}

/// Request path plus the normalized signal metadata of one inbound request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    path: String,
    metadata: BTreeMap<String, String>,
}

impl RequestContext {
    /// Create an empty context for the given request path
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Build a context from request headers, translating the signal cookie
    #[must_use]
    pub fn from_parts(path: &str, headers: &HeaderMap) -> Self {
        let mut ctx = Self::new(path);
        for (name, value) in headers {
            let name = name.as_str();
            if !name.starts_with(HEADER_PREFIX) {
                continue;
            }
            if let Ok(value) = value.to_str() {
                ctx.insert(header_key(name), value);
            }
        }
        ctx.translate_cookie(cookie_value(headers, SIGNAL_COOKIE).as_deref());
        ctx
    }

    /// Add a metadata entry
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Add a signal
    #[must_use]
    pub fn with_signal(self, signal: Signal, value: impl Into<String>) -> Self {
        self.with_metadata(signal.key(), value)
    }

    /// Insert or overwrite a metadata entry
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let _ = self.metadata.insert(key.into(), value.into());
    }

    /// Look up a raw metadata entry
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Look up a signal value
    #[must_use]
    pub fn signal(&self, signal: Signal) -> Option<&str> {
        self.get(signal.key())
    }

    /// Request path
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Test-run label; `Some` means coverage is armed for this request
    #[must_use]
    pub fn coverage_label(&self) -> Option<&str> {
        self.signal(Signal::Coverage)
    }

    /// Whether debug mode was requested
    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.signal(Signal::Debug).is_some()
    }

    /// Alternate config file name or path
    #[must_use]
    pub fn config_override(&self) -> Option<&str> {
        self.signal(Signal::Config)
    }

    /// Named suite
    #[must_use]
    pub fn suite(&self) -> Option<&str> {
        self.signal(Signal::Suite)
    }

    /// Install signals carried by the JSON cookie.
    ///
    /// Never fails: an absent or undecodable cookie leaves the context untouched.
    pub fn translate_cookie(&mut self, raw: Option<&str>) {
        let Some(signals) = raw.and_then(decode_signal_cookie) else {
            return;
        };
        for (name, value) in &signals {
            if let Some(value) = non_empty(value) {
                self.insert(format!("{METADATA_PREFIX}{}", name.to_uppercase()), value);
            }
        }
    }
}

/// `x-codeception-codecoverage-suite` -> `HTTP_X_CODECEPTION_CODECOVERAGE_SUITE`
fn header_key(name: &str) -> String {
    format!("HTTP_{}", name.to_ascii_uppercase().replace('-', "_"))
}

/// Find a cookie by name across all `Cookie` headers
#[must_use]
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

fn decode_signal_cookie(raw: &str) -> Option<Map<String, Value>> {
    let decoded = percent_decode_str(raw).decode_utf8_lossy();
    match serde_json::from_str::<Value>(&decoded) {
        Ok(Value::Object(signals)) => Some(signals),
        // WebDriver clients have been seen JSON-encoding the object twice
        Ok(Value::String(inner)) => match serde_json::from_str::<Value>(&inner) {
            Ok(Value::Object(signals)) => Some(signals),
            _ => None,
        },
        _ => None,
    }
}

fn non_empty(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::Bool(true) => Some("1".to_string()),
        Value::String(s) if s.is_empty() || s == "0" => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) if items.is_empty() => None,
        Value::Object(fields) if fields.is_empty() => None,
        other => Some(other.to_string()),
    }
}
