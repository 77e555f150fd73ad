// packages/listener/src/interception/models.rs
//! Request and response shapes handed to subscribers

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Header mapping as seen by subscribers
pub type Headers = BTreeMap<String, String>;

/// Normalized outgoing request
///
/// Absent fields stay `None`; nothing is defaulted to an empty value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestModel {
    pub method: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Bytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Headers>,
}

impl RequestModel {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            body: None,
            headers: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(Headers::new)
            .insert(name.into(), value.into());
        self
    }

    /// Shallow merge: every field set on the patch replaces the current one
    pub fn merge(mut self, patch: RequestPatch) -> Self {
        if let Some(method) = patch.method {
            self.method = method;
        }
        if let Some(url) = patch.url {
            self.url = url;
        }
        if let Some(body) = patch.body {
            self.body = Some(body);
        }
        if let Some(headers) = patch.headers {
            self.headers = Some(headers);
        }
        self
    }
}

/// Partial request returned by a pre-send subscriber
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Bytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Headers>,
}

impl RequestPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.method.is_none() && self.url.is_none() && self.body.is_none() && self.headers.is_none()
    }
}

/// Settled response as seen by post-arrival subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseModel {
    /// Body parsed as JSON, else the body text, `null` when empty
    pub response_parsed: serde_json::Value,
    pub status_code: u16,
    pub status_text: String,

    /// Unparsed body bytes
    #[serde(skip)]
    pub raw: Bytes,
}

impl ResponseModel {
    pub fn from_parts(status_code: u16, status_text: impl Into<String>, body: Bytes) -> Self {
        Self {
            response_parsed: parse_body(&body),
            status_code,
            status_text: status_text.into(),
            raw: body,
        }
    }
}

fn parse_body(body: &[u8]) -> serde_json::Value {
    if body.is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_slice(body).unwrap_or_else(|_| {
        serde_json::Value::String(String::from_utf8_lossy(body).into_owned())
    })
}

/// Request/response pair passed atomically to post-arrival subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestResponseModel {
    pub request: RequestModel,
    pub response: ResponseModel,
}
