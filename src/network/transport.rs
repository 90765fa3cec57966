//! Transport trait and request/response types

use crate::error::{Result, SearchError};
use async_trait::async_trait;
use serde_json::Value;

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

/// A request against the engine, relative to its base URL
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: HttpMethod,
    /// Path without leading slash, e.g. `hotel/_search`
    pub path: String,
    /// Query parameters
    pub params: Vec<(String, String)>,
    /// JSON body
    pub body: Option<Value>,
    /// Whether sending the request twice is harmless
    pub idempotent: bool,
}

impl ApiRequest {
    fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: Vec::new(),
            body: None,
            idempotent: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    /// Add a query parameter
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Add JSON body
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Mark the request as unsafe to resend after it may have reached the server.
    /// Scroll continuations are sent this way: each delivery advances the cursor by one page.
    pub fn not_idempotent(mut self) -> Self {
        self.idempotent = false;
        self
    }
}

/// HTTP response from the engine
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as text
    pub text: String,
}

impl ApiResponse {
    pub fn new(status: u16, text: impl Into<String>) -> Self {
        Self {
            status,
            text: text.into(),
        }
    }

    /// Parse response as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.text)
            .map_err(|e| SearchError::mapping(format!("unexpected response shape: {}", e)))
    }

    /// Check if response is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Gateway-level failures that usually clear up on their own
    pub fn is_transient_failure(&self) -> bool {
        matches!(self.status, 502 | 503 | 504)
    }

    /// The engine's own reason for a failure, falling back to the raw body
    pub fn error_reason(&self) -> String {
        let parsed: Option<Value> = serde_json::from_str(&self.text).ok();
        let error = parsed.as_ref().and_then(|v| v.get("error"));

        let reason = match error {
            Some(Value::String(s)) => Some(s.clone()),
            Some(obj) => obj
                .get("root_cause")
                .and_then(|rc| rc.get(0))
                .and_then(|rc| rc.get("reason"))
                .or_else(|| obj.get("reason"))
                .or_else(|| obj.get("type"))
                .and_then(|r| r.as_str())
                .map(str::to_string),
            None => None,
        };

        reason.unwrap_or_else(|| {
            let mut text = self.text.trim().to_string();
            if text.len() > 200 {
                let cut = (0..=200).rev().find(|i| text.is_char_boundary(*i)).unwrap_or(0);
                text.truncate(cut);
            }
            text
        })
    }

    /// Error type reported by the engine anywhere in the error body
    pub fn mentions_error_type(&self, error_type: &str) -> bool {
        self.text.contains(error_type)
    }

    /// Turn a non-2xx response into [`SearchError::Server`]
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(SearchError::Server {
                status: self.status,
                reason: self.error_reason(),
            })
        }
    }
}

/// Sends requests to the engine. [`super::HttpTransport`] is the production implementation.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse>;
}
