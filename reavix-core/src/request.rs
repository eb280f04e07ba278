//! Incoming request as seen by middleware, plugins and handlers.

use std::time::Instant;

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::headers::HeaderList;
use crate::trie::PathParam;
use crate::CoreError;

/// Request: method, path, raw query, headers, body, captured path params, trace id.
#[derive(Clone, Debug)]
pub struct Request {
    pub method: String,
    pub path: String,
    /// Raw query string without the leading `?`.
    pub query: String,
    pub headers: HeaderList,
    pub body: Bytes,
    /// Path params in capture order; filled by the pipeline after a route matched.
    pub params: HeaderList,
    pub trace_id: Option<String>,
    pub started_at: Instant,
}

impl Request {
    /// `target` may carry a query string (`/search?q=x`).
    pub fn new(method: impl Into<String>, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p, q),
            None => (target, ""),
        };
        Self {
            method: method.into(),
            path: path.to_owned(),
            query: query.to_owned(),
            headers: HeaderList::new(),
            body: Bytes::new(),
            params: HeaderList::new(),
            trace_id: None,
            started_at: Instant::now(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    /// Header value, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Path param value, case-insensitive.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Replace the params with a fresh capture.
    pub fn set_params(&mut self, params: Vec<PathParam>) {
        self.params = params.into_iter().map(|p| (p.name, p.value)).collect();
    }

    /// First value of `name` in the query string. No percent-decoding.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v)
    }

    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, CoreError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }
}
