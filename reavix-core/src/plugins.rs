//! Built-in plugins: request metrics, security headers, compression negotiation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::application::WS_METHOD;
use crate::compression::Compression;
use crate::pipeline::Plugin;
use crate::request::Request;
use crate::response::Response;
use crate::security::{CorsPolicy, SecurityPolicy};

pub const TRACE_ID_HEADER: &str = "X-Trace-Id";

/// Logs latency per request, counts handled requests and echoes the trace id.
#[derive(Clone, Debug, Default)]
pub struct RequestMetrics {
    handled: Arc<AtomicU64>,
}

impl RequestMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests observed so far. Shared between clones.
    pub fn handled(&self) -> u64 {
        self.handled.load(Ordering::Relaxed)
    }
}

impl Plugin for RequestMetrics {
    fn name(&self) -> &str {
        "request-metrics"
    }

    fn after(&self, req: &Request, res: &mut Response) {
        let count = self.handled.fetch_add(1, Ordering::Relaxed) + 1;
        let latency_ms = req.started_at.elapsed().as_secs_f64() * 1000.0;
        if let Some(trace_id) = req.trace_id() {
            res.set_header(TRACE_ID_HEADER, trace_id);
        }
        tracing::info!(
            trace_id = req.trace_id().unwrap_or("-"),
            method = %req.method,
            path = %req.path,
            status = res.status(),
            latency_ms,
            request = count,
            "request completed"
        );
    }
}

/// Applies the header parts of a [`SecurityPolicy`]: CSP, HSTS and CORS, including
/// preflight answers. CSRF settings are carried but not verified.
#[derive(Clone, Debug)]
pub struct SecurityHeaders {
    policy: SecurityPolicy,
}

impl SecurityHeaders {
    pub fn new(policy: SecurityPolicy) -> Self {
        Self { policy }
    }

    fn allowed_origin(cors: &CorsPolicy, origin: Option<&str>) -> Option<String> {
        if cors.allow_origins.iter().any(|o| o == "*") {
            return Some("*".to_string());
        }
        let origin = origin?;
        cors.allow_origins
            .iter()
            .any(|o| o == origin)
            .then(|| origin.to_string())
    }

    fn apply_cors(cors: &CorsPolicy, req: &Request, res: &mut Response) {
        let Some(origin) = Self::allowed_origin(cors, req.header("Origin")) else {
            return;
        };
        if !res.has_header("Access-Control-Allow-Origin") {
            if origin != "*" {
                res.set_header("Vary", "Origin");
            }
            res.set_header("Access-Control-Allow-Origin", origin);
            if cors.allow_credentials {
                res.set_header("Access-Control-Allow-Credentials", "true");
            }
        }
    }
}

impl Plugin for SecurityHeaders {
    fn name(&self) -> &str {
        "security-headers"
    }

    fn before(&self, req: &mut Request, res: &mut Response) {
        let Some(cors) = &self.policy.cors else {
            return;
        };
        if req.method != "OPTIONS" || req.header("Access-Control-Request-Method").is_none() {
            return;
        }
        res.set_header("Access-Control-Allow-Methods", cors.allow_methods.join(", "));
        if !cors.allow_headers.is_empty() {
            res.set_header("Access-Control-Allow-Headers", cors.allow_headers.join(", "));
        }
        Self::apply_cors(cors, req, res);
        res.send_text(204, "text/plain", Vec::new());
    }

    fn after(&self, req: &Request, res: &mut Response) {
        if let Some(csp) = &self.policy.content_security_policy {
            if !res.has_header("Content-Security-Policy") {
                res.set_header("Content-Security-Policy", csp.as_str());
            }
        }
        if let Some(hsts) = &self.policy.hsts {
            if !res.has_header("Strict-Transport-Security") {
                res.set_header("Strict-Transport-Security", hsts.header_value());
            }
        }
        if let Some(cors) = &self.policy.cors {
            Self::apply_cors(cors, req, res);
        }
    }
}

/// Selects the response compression mode from `Accept-Encoding`. WebSocket messages are
/// never compressed: the header belongs to the upgrade request.
#[derive(Clone, Copy, Debug, Default)]
pub struct NegotiateCompression;

impl Plugin for NegotiateCompression {
    fn name(&self) -> &str {
        "negotiate-compression"
    }

    fn before(&self, req: &mut Request, res: &mut Response) {
        if req.method == WS_METHOD {
            return;
        }
        if let Some(accept) = req.header("Accept-Encoding") {
            res.set_compression(Compression::negotiate(accept));
        }
    }
}
