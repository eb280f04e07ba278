//! Security and rate-limit configuration.
//!
//! Only the configuration surface lives here. The header-based parts of [`SecurityPolicy`]
//! (CSP, HSTS, CORS) are applied by [`crate::plugins::SecurityHeaders`]. Rate limits and
//! CSRF checks are NOT enforced: [`RateLimiter`] is a seam for an external implementation
//! and the default [`NoRateLimit`] admits every request.

use serde::{Deserialize, Serialize};

use crate::Request;

/// Per-route limit, stored on the route's trie node.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct RateLimit {
    pub requests_per_second: u32,
    pub burst: u32,
}

/// Decides whether a request on a rate-limited route may proceed.
pub trait RateLimiter: Send + Sync {
    fn check(&self, req: &Request, limit: &RateLimit) -> bool;
}

/// No-op limiter: admits everything. Enforcement is left to an external implementation.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRateLimit;

impl RateLimiter for NoRateLimit {
    fn check(&self, _req: &Request, _limit: &RateLimit) -> bool {
        true
    }
}

/// Global security policy.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityPolicy {
    pub cors: Option<CorsPolicy>,
    pub csrf: Option<CsrfPolicy>,
    /// Value of the `Content-Security-Policy` header.
    pub content_security_policy: Option<String>,
    pub hsts: Option<HstsPolicy>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsPolicy {
    pub allow_origins: Vec<String>,
    pub allow_methods: Vec<String>,
    pub allow_headers: Vec<String>,
    pub allow_credentials: bool,
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self {
            allow_origins: vec!["*".to_string()],
            allow_methods: vec!["GET".to_string(), "POST".to_string()],
            allow_headers: Vec::new(),
            allow_credentials: false,
        }
    }
}

/// CSRF token settings. Configuration only; tokens are not verified by the core.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct CsrfPolicy {
    pub header_name: String,
    pub cookie_name: String,
}

impl Default for CsrfPolicy {
    fn default() -> Self {
        Self {
            header_name: "X-CSRF-Token".to_string(),
            cookie_name: "csrf_token".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct HstsPolicy {
    pub max_age_secs: u64,
    pub include_subdomains: bool,
}

impl Default for HstsPolicy {
    fn default() -> Self {
        Self {
            max_age_secs: 31_536_000,
            include_subdomains: true,
        }
    }
}

impl HstsPolicy {
    /// `Strict-Transport-Security` header value.
    pub fn header_value(&self) -> String {
        if self.include_subdomains {
            format!("max-age={}; includeSubDomains", self.max_age_secs)
        } else {
            format!("max-age={}", self.max_age_secs)
        }
    }
}
